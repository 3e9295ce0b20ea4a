//! Error types for the tamper guard.

use qfloor_integrity::IntegrityError;
use thiserror::Error;

/// Result type for guard operations.
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors that can occur while arming or running the guard.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The guard has fired and can no longer be armed.
    #[error("self-destruct already triggered")]
    AlreadyTriggered,

    /// A protected file could not be hashed for the baseline.
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    /// Underlying filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
