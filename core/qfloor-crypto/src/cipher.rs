//! Token encryption using ChaCha20-Poly1305.
//!
//! A token is `version || nonce || ciphertext`, where the ciphertext carries
//! the Poly1305 tag. The version byte is bound to the tag as associated data.

use crate::error::{CryptoError, CryptoResult};
use crate::key::KeyMaterial;
use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use rand::RngCore;

/// Leading byte of every token.
pub const TOKEN_VERSION: u8 = 0x80;

/// Size of nonce in bytes (96 bits for ChaCha20-Poly1305).
pub const NONCE_SIZE: usize = 12;

/// Size of authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Bytes a token adds on top of its plaintext.
pub const TOKEN_OVERHEAD: usize = 1 + NONCE_SIZE + TAG_SIZE;

/// Encrypts plaintext into a self-describing token.
pub fn encrypt(key: &KeyMaterial, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad: &[TOKEN_VERSION],
            },
        )
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut token = Vec::with_capacity(TOKEN_OVERHEAD + plaintext.len());
    token.push(TOKEN_VERSION);
    token.extend_from_slice(&nonce_bytes);
    token.extend_from_slice(&ciphertext);
    Ok(token)
}

/// Decrypts a token produced by [`encrypt`] under the same key.
///
/// Truncated tokens, unknown versions, wrong keys and modified bytes all
/// fail with [`CryptoError::DecryptionFailed`].
pub fn decrypt(key: &KeyMaterial, token: &[u8]) -> CryptoResult<Vec<u8>> {
    if token.len() < TOKEN_OVERHEAD || token[0] != TOKEN_VERSION {
        return Err(CryptoError::DecryptionFailed);
    }

    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
    let nonce = Nonce::from_slice(&token[1..1 + NONCE_SIZE]);

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: &token[1 + NONCE_SIZE..],
                aad: &[TOKEN_VERSION],
            },
        )
        .map_err(|_| CryptoError::DecryptionFailed)
}
