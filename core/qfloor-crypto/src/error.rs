//! Error types for the encryption layer.
//!
//! No variant carries key bytes. Messages describe what failed, never the
//! material involved.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Ciphertext was not produced by any key in the active set, or was
    /// modified after encryption.
    #[error("decryption failed (wrong key or tampered data)")]
    DecryptionFailed,

    /// Serialized key material could not be decoded.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// No key is loaded (never initialized, or cleared).
    #[error("cipher not initialized: no key loaded")]
    NotInitialized,

    /// `rotate_encrypt` was called before `setup_key_rotation`.
    #[error("key rotation not configured")]
    RotationNotConfigured,

    /// Reading or writing a file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
