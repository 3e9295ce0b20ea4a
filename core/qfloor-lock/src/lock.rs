//! A lock bound to one protected model.

use crate::artifact::{LockArtifact, check_magic, read_raw};
use crate::error::{LockError, LockResult};
use chrono::NaiveDateTime;
use qfloor_crypto::{CipherManager, KeyMaterial, Zeroizing};
use qfloor_integrity::hash_file;
use qfloor_license::{LicenseKey, LicenseTier};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Called with `(model_name, reason)` when a lock is flagged.
pub type TamperObserver = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Lifecycle of a [`QuantumLock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    /// Artifact found and prefix checked; no key loaded.
    LockLoaded,
    /// Key loaded; encrypt and decrypt are available.
    Verified,
    /// Tampering detected. Terminal for this instance.
    TamperFlagged,
}

/// Snapshot returned by [`QuantumLock::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStatus {
    pub is_locked: bool,
    pub is_valid: bool,
    pub license_type: Option<LicenseTier>,
    pub expires: Option<NaiveDateTime>,
    pub model_name: String,
    pub integrity_verified: bool,
    pub tamper_flagged: bool,
}

/// Gates encryption of one model behind its lock artifact.
///
/// `verify_license` loads the artifact key. It records the license string
/// but does not judge it; expiry and quotas belong to the license checker.
pub struct QuantumLock {
    path: PathBuf,
    model_name: String,
    state: LockState,
    cipher: CipherManager,
    license: Option<LicenseKey>,
    integrity_verified: bool,
    on_tamper: Option<TamperObserver>,
}

impl fmt::Debug for QuantumLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuantumLock")
            .field("path", &self.path)
            .field("model_name", &self.model_name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl QuantumLock {
    /// Opens the artifact at `path`.
    ///
    /// # Errors
    ///
    /// [`LockError::NotFound`] if the file is missing,
    /// [`LockError::InvalidFormat`] if it lacks the magic prefix.
    pub fn open(path: impl Into<PathBuf>, model_name: impl Into<String>) -> LockResult<Self> {
        let path = path.into();
        check_magic(&read_raw(&path)?)?;
        Ok(Self {
            path,
            model_name: model_name.into(),
            state: LockState::LockLoaded,
            cipher: CipherManager::new(),
            license: None,
            integrity_verified: false,
            on_tamper: None,
        })
    }

    /// Writes a new artifact to `path` and returns its key.
    pub fn generate_lock(path: impl AsRef<Path>) -> LockResult<KeyMaterial> {
        crate::artifact::generate_lock(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_verified(&self) -> bool {
        self.state == LockState::Verified
    }

    pub fn is_tampered(&self) -> bool {
        self.state == LockState::TamperFlagged
    }

    /// The license recorded by the last successful `verify_license`, if it
    /// parsed.
    pub fn license(&self) -> Option<&LicenseKey> {
        self.license.as_ref()
    }

    /// Registers a callback run when the lock is flagged.
    pub fn on_tamper(&mut self, observer: impl Fn(&str, &str) + Send + Sync + 'static) {
        self.on_tamper = Some(Arc::new(observer));
    }

    /// Loads the artifact key and records `license_key`.
    ///
    /// Returns false if the artifact is malformed or the lock is flagged.
    pub fn verify_license(&mut self, license_key: &str) -> bool {
        if self.is_tampered() {
            warn!("refusing to verify tampered lock for {}", self.model_name);
            return false;
        }

        match LockArtifact::read(&self.path) {
            Ok(artifact) => {
                self.cipher.load_key(artifact.into_key());
                self.license = LicenseKey::parse(license_key).ok();
                self.state = LockState::Verified;
                info!("lock verified for {}", self.model_name);
                true
            }
            Err(e) => {
                warn!("lock for {} failed to load: {}", self.model_name, e);
                self.cipher.clear();
                self.license = None;
                self.state = LockState::LockLoaded;
                false
            }
        }
    }

    /// Fails unless the lock is verified and not flagged.
    pub fn ensure_ready(&self) -> LockResult<()> {
        match self.state {
            LockState::Verified => Ok(()),
            LockState::LockLoaded => Err(LockError::NotVerified),
            LockState::TamperFlagged => Err(LockError::Tampered(self.model_name.clone())),
        }
    }

    /// Encrypts `data` under the lock key.
    pub fn encrypt(&self, data: &[u8]) -> LockResult<Vec<u8>> {
        self.ensure_ready()?;
        Ok(self.cipher.encrypt(data)?)
    }

    /// Decrypts `token` into a buffer wiped on drop.
    ///
    /// An authentication failure flags the lock before the error is
    /// returned.
    pub fn decrypt(&mut self, token: &[u8]) -> LockResult<Zeroizing<Vec<u8>>> {
        self.ensure_ready()?;
        match self.cipher.decrypt(token) {
            Ok(plaintext) => Ok(Zeroizing::new(plaintext)),
            Err(e) => {
                let err = LockError::from(e);
                if matches!(err, LockError::DecryptionFailed) {
                    self.raise_tamper("ciphertext failed authentication");
                }
                Err(err)
            }
        }
    }

    /// Compares the SHA-256 of `path` with `expected_hash`. A mismatch
    /// flags the lock.
    pub fn verify_integrity(
        &mut self,
        path: impl AsRef<Path>,
        expected_hash: &str,
    ) -> LockResult<bool> {
        let path = path.as_ref();
        let actual = hash_file(path)?;
        if !actual.eq_ignore_ascii_case(expected_hash) {
            self.integrity_verified = false;
            self.raise_tamper(&format!("hash mismatch for {}", path.display()));
            return Ok(false);
        }
        debug!("integrity ok for {:?}", path);
        self.integrity_verified = true;
        Ok(true)
    }

    /// Flags the lock as tampered and drops its key.
    ///
    /// Later calls on a flagged lock are no-ops.
    pub fn raise_tamper(&mut self, reason: &str) {
        if self.is_tampered() {
            return;
        }
        error!("tampering attempt detected for {}: {}", self.model_name, reason);
        self.state = LockState::TamperFlagged;
        self.cipher.clear();
        if let Some(observer) = &self.on_tamper {
            observer(&self.model_name, reason);
        }
    }

    pub fn status(&self) -> LockStatus {
        let verified = self.is_verified();
        LockStatus {
            is_locked: !verified,
            is_valid: verified,
            license_type: self.license.as_ref().map(LicenseKey::tier),
            expires: self.license.as_ref().map(LicenseKey::expires),
            model_name: self.model_name.clone(),
            integrity_verified: self.integrity_verified,
            tamper_flagged: self.is_tampered(),
        }
    }

    /// Drops the key and the recorded license. A verified lock returns to
    /// [`LockState::LockLoaded`]; a flagged lock stays flagged.
    pub fn close(&mut self) {
        self.cipher.clear();
        self.license = None;
        self.integrity_verified = false;
        if self.state == LockState::Verified {
            self.state = LockState::LockLoaded;
        }
    }
}
