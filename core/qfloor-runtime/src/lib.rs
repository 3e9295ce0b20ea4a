//! Runtime wiring for Quantum Lock.
//!
//! [`ProtectionConfig`] describes a deployment: where the license comes
//! from, which files the guard watches, what happens when it fires, and
//! which lock artifacts to load. [`ProtectionContext`] builds the
//! components from it and connects them, so that a critical or fatal
//! tamper event flags every lock.
//!
//! ```no_run
//! use qfloor_runtime::{ProtectionConfig, ProtectionContext};
//!
//! let context = ProtectionContext::new(ProtectionConfig::load()?)?;
//! context.unlock_from_env()?;
//! context.arm_guard()?;
//! let weights = context.decrypt("regis-7b-c", &std::fs::read("model.enc")?)?;
//! assert!(context.check());
//! # Ok::<(), qfloor_runtime::RuntimeError>(())
//! ```

mod config;
mod context;
mod error;

pub use config::{
    ActionKind, CONFIG_DIR, CONFIG_FILE, GuardSection, IntegritySection, LicenseSection,
    LockEntry, ProtectionConfig,
};
pub use context::ProtectionContext;
pub use error::{RuntimeError, RuntimeResult};
