//! Error types for the licensing module.

use std::path::PathBuf;
use thiserror::Error;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Key has fewer than three segments or an empty model segment.
    #[error("invalid license key format: {0}")]
    MalformedKey(String),

    /// License has expired.
    #[error("license expired on {0}")]
    Expired(String),

    /// Usage quota for the current license is used up.
    #[error("request limit exceeded ({limit} requests)")]
    QuotaExceeded { limit: i64 },

    /// No valid license has been checked yet.
    #[error("no valid license")]
    NoLicense,

    /// License file does not exist.
    #[error("license file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// License file has no key on its first line.
    #[error("empty license file: {}", .0.display())]
    EmptyFile(PathBuf),

    /// Environment variable holding the key is unset or blank.
    #[error("environment variable {0} not set")]
    NotSet(String),

    /// Activation failed.
    #[error("activation failed: {0}")]
    ActivationFailed(String),

    /// Device limit exceeded.
    #[error("device limit exceeded (max {0} devices)")]
    DeviceLimitExceeded(u32),

    /// Network error during activation.
    #[error("network error: {0}")]
    Network(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
