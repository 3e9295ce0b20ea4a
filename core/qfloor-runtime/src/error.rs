//! Error types for the protection context.

use qfloor_guard::GuardError;
use qfloor_integrity::IntegrityError;
use qfloor_license::LicenseError;
use qfloor_lock::LockError;
use thiserror::Error;

/// Result type for context operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors surfaced by [`crate::ProtectionContext`] and its configuration.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration file is malformed or lacks a required setting.
    #[error("configuration error: {0}")]
    Config(String),

    /// License missing, malformed, expired or over quota.
    #[error(transparent)]
    License(#[from] LicenseError),

    /// A lock refused the operation or could not be loaded.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Manifest verification failed to run.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// The guard could not be armed.
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// Underlying filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
