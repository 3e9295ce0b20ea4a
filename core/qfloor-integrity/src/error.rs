//! Error types for hashing and manifest handling.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for integrity operations.
pub type VerifierResult<T> = Result<T, IntegrityError>;

/// Errors that can occur while hashing files or reading manifests.
#[derive(Debug, Error)]
pub enum IntegrityError {
    /// File or manifest does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Manifest is not valid JSON or names an unsupported algorithm.
    #[error("invalid manifest: {0}")]
    InvalidFormat(String),

    /// Directory pattern could not be compiled.
    #[error("invalid glob pattern: {0}")]
    Pattern(String),

    /// Underlying filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
