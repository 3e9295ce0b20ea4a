//! Symmetric encryption for Quantum Lock.
//!
//! - [`KeyMaterial`]: 32-byte keys, serialized as base64url, wiped on drop
//! - [`derive_key`]: PBKDF2-HMAC-SHA256 password derivation
//! - [`encrypt`] / [`decrypt`]: ChaCha20-Poly1305 tokens
//! - [`CipherManager`]: active key, rotation set, file helpers

mod cipher;
mod error;
mod key;
mod manager;

pub use cipher::{NONCE_SIZE, TAG_SIZE, TOKEN_OVERHEAD, TOKEN_VERSION, decrypt, encrypt};
pub use error::{CryptoError, CryptoResult};
pub use key::{
    DEFAULT_PBKDF2_ITERATIONS, ENCODED_KEY_LEN, KEY_SIZE, KdfParams, KeyMaterial, SALT_SIZE,
    Salt, derive_key,
};
pub use manager::{CipherManager, decrypt_model_to_memory, encrypt_model};
pub use zeroize::Zeroizing;
