//! Key material and password-based key derivation.
//!
//! Uses PBKDF2-HMAC-SHA256 for deriving encryption keys from passwords.
//! Keys serialize as padded base64url, 44 ASCII bytes for a 32-byte key.

use crate::error::{CryptoError, CryptoResult};
use base64::{Engine, engine::general_purpose::URL_SAFE};
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of encryption keys in bytes (256 bits for ChaCha20).
pub const KEY_SIZE: usize = 32;

/// Length of a key in its serialized base64url form.
pub const ENCODED_KEY_LEN: usize = 44;

/// Size of salt in bytes.
pub const SALT_SIZE: usize = 16;

/// Default PBKDF2 iteration count (OWASP 2023 guidance for HMAC-SHA256).
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 480_000;

/// Symmetric key bytes with automatic zeroization on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    bytes: [u8; KEY_SIZE],
}

impl KeyMaterial {
    /// Generates a random key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates key material from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Serializes the key as padded base64url.
    pub fn to_encoded(&self) -> Zeroizing<String> {
        Zeroizing::new(URL_SAFE.encode(self.bytes))
    }

    /// Parses a key from its padded base64url form.
    ///
    /// Surrounding ASCII whitespace is ignored so keys saved with a trailing
    /// newline still load.
    pub fn from_encoded(encoded: &[u8]) -> CryptoResult<Self> {
        let trimmed = encoded.trim_ascii();
        if trimmed.len() != ENCODED_KEY_LEN {
            return Err(CryptoError::InvalidKey(format!(
                "expected {ENCODED_KEY_LEN} encoded bytes, got {}",
                trimmed.len()
            )));
        }

        let decoded = Zeroizing::new(
            URL_SAFE
                .decode(trimmed)
                .map_err(|_| CryptoError::InvalidKey("not valid base64url".to_string()))?,
        );
        if decoded.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "expected {KEY_SIZE} key bytes, got {}",
                decoded.len()
            )));
        }

        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&decoded);
        Ok(Self { bytes })
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Salt for key derivation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Salt {
    bytes: [u8; SALT_SIZE],
}

impl Salt {
    /// Generates a random salt.
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates a salt from raw bytes.
    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the salt bytes.
    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.bytes
    }
}

/// Key derivation parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KdfParams {
    /// PBKDF2 iteration count.
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl KdfParams {
    /// Creates parameters for testing (fast but insecure).
    #[cfg(test)]
    pub fn test() -> Self {
        Self { iterations: 1_000 }
    }
}

/// Derives an encryption key from a password using PBKDF2-HMAC-SHA256.
///
/// The same password, salt and parameters always produce the same key.
pub fn derive_key(password: &str, salt: &Salt, params: &KdfParams) -> CryptoResult<KeyMaterial> {
    if params.iterations == 0 {
        return Err(CryptoError::KeyDerivation(
            "iteration count must be non-zero".to_string(),
        ));
    }

    let mut key_bytes = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        salt.as_bytes(),
        params.iterations,
        &mut key_bytes,
    );

    let key = KeyMaterial::from_bytes(key_bytes);
    key_bytes.zeroize();
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_key_is_44_url_safe_chars() {
        let key = KeyMaterial::generate();
        let encoded = key.to_encoded();
        assert_eq!(encoded.len(), ENCODED_KEY_LEN);
        assert!(
            encoded
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '=')
        );
    }

    #[test]
    fn derive_with_test_params_is_deterministic() {
        let salt = Salt::from_bytes([7; SALT_SIZE]);
        let a = derive_key("pw", &salt, &KdfParams::test()).unwrap();
        let b = derive_key("pw", &salt, &KdfParams::test()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_iterations_rejected() {
        let salt = Salt::random();
        let err = derive_key("pw", &salt, &KdfParams { iterations: 0 }).unwrap_err();
        assert!(matches!(err, CryptoError::KeyDerivation(_)));
    }
}
