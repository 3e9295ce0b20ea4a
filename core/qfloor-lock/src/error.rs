//! Error types for lock operations.

use qfloor_crypto::CryptoError;
use qfloor_integrity::IntegrityError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;

/// Errors that can occur while loading or using a lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// Lock file, or a file being verified, does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Lock file lacks the magic prefix or has the wrong length.
    #[error("invalid lock file format: {0}")]
    InvalidFormat(String),

    /// Crypto operation attempted before a successful `verify_license`.
    #[error("lock not verified; call verify_license first")]
    NotVerified,

    /// Ciphertext failed authentication. The lock is now flagged.
    #[error("decryption failed (wrong key or tampered data)")]
    DecryptionFailed,

    /// The lock was flagged as tampered and refuses further use.
    #[error("lock for {0} is flagged as tampered")]
    Tampered(String),

    /// No lock registered under this model name.
    #[error("no lock registered for model {0}")]
    ModelNotRegistered(String),

    #[error("crypto error: {0}")]
    Crypto(CryptoError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CryptoError> for LockError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::DecryptionFailed => Self::DecryptionFailed,
            CryptoError::Io(e) => Self::Io(e),
            other => Self::Crypto(other),
        }
    }
}

impl From<IntegrityError> for LockError {
    fn from(err: IntegrityError) -> Self {
        match err {
            IntegrityError::NotFound(path) => Self::NotFound(path),
            IntegrityError::Io(e) => Self::Io(e),
            other => Self::InvalidFormat(other.to_string()),
        }
    }
}
