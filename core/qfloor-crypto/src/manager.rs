//! Key lifecycle around the token cipher.
//!
//! A [`CipherManager`] owns one primary key and, after
//! [`CipherManager::setup_key_rotation`], an ordered list of retired keys.
//! Encryption always uses the primary key. Decryption accepts tokens from
//! any key in the set.

use crate::cipher;
use crate::error::{CryptoError, CryptoResult};
use crate::key::{KdfParams, KeyMaterial, Salt, derive_key};
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Symmetric encryption with key generation, derivation and rotation.
///
/// All mutation goes through `&mut self`. Share an instance across threads
/// only behind a lock.
#[derive(Debug, Default)]
pub struct CipherManager {
    primary: Option<KeyMaterial>,
    retired: Vec<KeyMaterial>,
    rotation: bool,
    kdf: KdfParams,
}

impl CipherManager {
    /// Creates a manager with no key loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager that derives password keys with `params`.
    pub fn with_kdf_params(params: KdfParams) -> Self {
        Self {
            kdf: params,
            ..Self::default()
        }
    }

    /// Generates a random key and makes it the active key.
    pub fn generate_key(&mut self) -> KeyMaterial {
        let key = KeyMaterial::generate();
        self.install(key.clone());
        key
    }

    /// Makes `key` the active key.
    pub fn load_key(&mut self, key: KeyMaterial) {
        self.install(key);
    }

    /// Loads a key saved by [`CipherManager::save_key_to_file`].
    pub fn load_key_from_file(&mut self, path: impl AsRef<Path>) -> CryptoResult<()> {
        let encoded = Zeroizing::new(fs::read(path.as_ref())?);
        let key = KeyMaterial::from_encoded(&encoded)?;
        self.install(key);
        Ok(())
    }

    /// Writes the active key to `path` in its base64url form.
    pub fn save_key_to_file(&self, path: impl AsRef<Path>) -> CryptoResult<()> {
        let key = self.primary.as_ref().ok_or(CryptoError::NotInitialized)?;
        fs::write(path.as_ref(), key.to_encoded().as_bytes())?;
        Ok(())
    }

    /// Derives a key from `password` and makes it the active key.
    ///
    /// A random salt is generated when none is supplied. The salt is
    /// returned so the caller can persist it next to the ciphertext.
    pub fn derive_key_from_password(
        &mut self,
        password: &str,
        salt: Option<Salt>,
    ) -> CryptoResult<(KeyMaterial, Salt)> {
        let salt = salt.unwrap_or_else(Salt::random);
        let key = derive_key(password, &salt, &self.kdf)?;
        self.install(key.clone());
        Ok((key, salt))
    }

    /// Returns true when a key is loaded.
    pub fn is_initialized(&self) -> bool {
        self.primary.is_some()
    }

    /// Returns true when retired keys are accepted for decryption.
    pub fn has_rotation(&self) -> bool {
        self.rotation
    }

    /// Encrypts `data` under the active key.
    pub fn encrypt(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        let key = self.primary.as_ref().ok_or(CryptoError::NotInitialized)?;
        cipher::encrypt(key, data)
    }

    /// Decrypts a token produced by any key in the active set.
    pub fn decrypt(&self, token: &[u8]) -> CryptoResult<Vec<u8>> {
        let primary = self.primary.as_ref().ok_or(CryptoError::NotInitialized)?;

        std::iter::once(primary)
            .chain(self.retired.iter())
            .find_map(|key| cipher::decrypt(key, token).ok())
            .ok_or(CryptoError::DecryptionFailed)
    }

    /// Encrypts the file at `input` and writes the token to `output`.
    pub fn encrypt_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> CryptoResult<()> {
        let data = Zeroizing::new(fs::read(input.as_ref())?);
        let token = self.encrypt(&data)?;
        fs::write(output.as_ref(), token)?;
        debug!("encrypted {:?} -> {:?}", input.as_ref(), output.as_ref());
        Ok(())
    }

    /// Decrypts the token at `input` and writes the plaintext to `output`.
    pub fn decrypt_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> CryptoResult<()> {
        let plaintext = self.decrypt_to_memory(input.as_ref())?;
        fs::write(output.as_ref(), plaintext.as_slice())?;
        debug!("decrypted {:?} -> {:?}", input.as_ref(), output.as_ref());
        Ok(())
    }

    /// Decrypts the token at `input` into memory only.
    ///
    /// The plaintext buffer is wiped when dropped.
    pub fn decrypt_to_memory(&self, input: impl AsRef<Path>) -> CryptoResult<Zeroizing<Vec<u8>>> {
        let token = fs::read(input.as_ref())?;
        self.decrypt(&token).map(Zeroizing::new)
    }

    /// Makes `new_key` the primary key while still accepting tokens from
    /// `old_keys` on decryption. Order of `old_keys` is the trial order.
    pub fn setup_key_rotation(&mut self, new_key: KeyMaterial, old_keys: Vec<KeyMaterial>) {
        info!("key rotation configured with {} retired key(s)", old_keys.len());
        self.primary = Some(new_key);
        self.retired = old_keys;
        self.rotation = true;
    }

    /// Re-encrypts a token from any key in the set under the primary key.
    ///
    /// The intermediate plaintext never leaves this call and is wiped before
    /// returning.
    pub fn rotate_encrypt(&self, token: &[u8]) -> CryptoResult<Vec<u8>> {
        self.primary.as_ref().ok_or(CryptoError::NotInitialized)?;
        if !self.rotation {
            return Err(CryptoError::RotationNotConfigured);
        }
        let plaintext = Zeroizing::new(self.decrypt(token)?);
        self.encrypt(&plaintext)
    }

    /// Drops all key material. Later crypto calls fail with
    /// [`CryptoError::NotInitialized`] until a key is loaded again.
    pub fn clear(&mut self) {
        // KeyMaterial wipes itself on drop.
        self.primary = None;
        self.retired.clear();
        self.rotation = false;
    }

    fn install(&mut self, key: KeyMaterial) {
        self.primary = Some(key);
        self.retired.clear();
        self.rotation = false;
    }
}

/// Encrypts a model file, generating a key when none is given.
///
/// Returns the key the file was encrypted under.
pub fn encrypt_model(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    key: Option<KeyMaterial>,
) -> CryptoResult<KeyMaterial> {
    let mut manager = CipherManager::new();
    let key = match key {
        Some(key) => {
            manager.load_key(key.clone());
            key
        }
        None => manager.generate_key(),
    };
    manager.encrypt_file(input, output)?;
    Ok(key)
}

/// Decrypts an encrypted model file into memory.
pub fn decrypt_model_to_memory(
    input: impl AsRef<Path>,
    key: KeyMaterial,
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let mut manager = CipherManager::new();
    manager.load_key(key);
    manager.decrypt_to_memory(input)
}
