//! The lock artifact file: `QUANTUM_LOCK_V1:` followed by a base64url key.

use crate::error::{LockError, LockResult};
use qfloor_crypto::{ENCODED_KEY_LEN, KeyMaterial, Zeroizing};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Magic prefix of every lock artifact.
pub const LOCK_MAGIC: &[u8; 16] = b"QUANTUM_LOCK_V1:";

/// Exact byte length of a well-formed artifact.
pub const LOCK_ARTIFACT_LEN: usize = LOCK_MAGIC.len() + ENCODED_KEY_LEN;

/// A parsed lock artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockArtifact {
    key: KeyMaterial,
}

impl LockArtifact {
    pub fn new(key: KeyMaterial) -> Self {
        Self { key }
    }

    pub fn key(&self) -> &KeyMaterial {
        &self.key
    }

    pub fn into_key(self) -> KeyMaterial {
        self.key
    }

    /// Serialized artifact bytes. Wiped on drop.
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        let encoded = self.key.to_encoded();
        let mut out = Zeroizing::new(Vec::with_capacity(LOCK_ARTIFACT_LEN));
        out.extend_from_slice(LOCK_MAGIC);
        out.extend_from_slice(encoded.as_bytes());
        out
    }

    /// Parses artifact bytes, checking prefix, length and key encoding.
    pub fn from_bytes(data: &[u8]) -> LockResult<Self> {
        check_magic(data)?;
        if data.len() != LOCK_ARTIFACT_LEN {
            return Err(LockError::InvalidFormat(format!(
                "expected {LOCK_ARTIFACT_LEN} bytes, got {}",
                data.len()
            )));
        }
        let key = KeyMaterial::from_encoded(&data[LOCK_MAGIC.len()..])
            .map_err(|e| LockError::InvalidFormat(e.to_string()))?;
        Ok(Self { key })
    }

    /// Reads and parses the artifact at `path`.
    pub fn read(path: impl AsRef<Path>) -> LockResult<Self> {
        let data = read_raw(path.as_ref())?;
        Self::from_bytes(&data)
    }

    /// Writes the artifact to `path`, replacing any existing file.
    pub fn write(&self, path: impl AsRef<Path>) -> LockResult<()> {
        fs::write(path.as_ref(), self.to_bytes().as_slice())?;
        Ok(())
    }
}

/// Creates a fresh artifact at `path` and returns its key.
pub fn generate_lock(path: impl AsRef<Path>) -> LockResult<KeyMaterial> {
    let key = KeyMaterial::generate();
    LockArtifact::new(key.clone()).write(path)?;
    Ok(key)
}

pub(crate) fn read_raw(path: &Path) -> LockResult<Zeroizing<Vec<u8>>> {
    fs::read(path).map(Zeroizing::new).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LockError::NotFound(path.to_path_buf()),
        _ => LockError::Io(e),
    })
}

pub(crate) fn check_magic(data: &[u8]) -> LockResult<()> {
    if data.starts_with(LOCK_MAGIC) {
        Ok(())
    } else {
        Err(LockError::InvalidFormat("missing lock magic".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_is_sixty_bytes() {
        assert_eq!(LOCK_ARTIFACT_LEN, 60);
        let artifact = LockArtifact::new(KeyMaterial::generate());
        assert_eq!(artifact.to_bytes().len(), 60);
    }

    #[test]
    fn bytes_roundtrip() {
        let artifact = LockArtifact::new(KeyMaterial::generate());
        let parsed = LockArtifact::from_bytes(&artifact.to_bytes()).unwrap();
        assert_eq!(parsed, artifact);
    }

    #[test]
    fn trailing_byte_rejected() {
        let artifact = LockArtifact::new(KeyMaterial::generate());
        let mut bytes = artifact.to_bytes().to_vec();
        bytes.push(b'=');
        assert!(matches!(
            LockArtifact::from_bytes(&bytes),
            Err(LockError::InvalidFormat(_))
        ));
    }
}
