//! File integrity for protected distributions.
//!
//! [`hash_file`] is the streaming SHA-256 primitive shared with the lock and
//! the tamper guard. [`IntegrityVerifier`] keeps a path to digest manifest
//! in memory, persists it as `integrity.json` and checks files against it.
//!
//! ```no_run
//! use qfloor_integrity::{create_distribution_manifest, verify_distribution};
//!
//! create_distribution_manifest("dist", None)?;
//! let (ok, results) = verify_distribution("dist")?;
//! assert!(ok, "{} files checked", results.len());
//! # Ok::<(), qfloor_integrity::IntegrityError>(())
//! ```

mod error;
mod hash;
mod manifest;
mod verifier;

pub use error::{IntegrityError, VerifierResult};
pub use hash::{CHUNK_SIZE, hash_bytes, hash_file};
pub use manifest::{DEFAULT_MANIFEST_NAME, MANIFEST_ALGORITHM, Manifest};
pub use verifier::{
    DEFAULT_PATTERN, IntegrityResult, IntegrityVerifier, create_distribution_manifest,
    verify_distribution,
};
