//! Per-model locks for Quantum Lock.
//!
//! A lock artifact is a 60-byte file holding [`LOCK_MAGIC`] and one
//! base64url key. A [`QuantumLock`] opens the artifact, loads its key on
//! `verify_license`, and then encrypts and decrypts payloads for its model.
//! An authentication failure during decryption flags the lock as tampered,
//! after which it refuses all crypto.
//!
//! ```no_run
//! use qfloor_lock::QuantumLock;
//!
//! QuantumLock::generate_lock("model.lock")?;
//! let mut lock = QuantumLock::open("model.lock", "regis-7b-c")?;
//! assert!(lock.verify_license("REGIS-7B-C-LICENSE-TRIAL-2025"));
//! let token = lock.encrypt(b"weights")?;
//! let plain = lock.decrypt(&token)?;
//! # Ok::<(), qfloor_lock::LockError>(())
//! ```

mod artifact;
mod error;
mod lock;
mod manager;

pub use artifact::{LOCK_ARTIFACT_LEN, LOCK_MAGIC, LockArtifact, generate_lock};
pub use error::{LockError, LockResult};
pub use lock::{LockState, LockStatus, QuantumLock, TamperObserver};
pub use manager::QuantumLockManager;
