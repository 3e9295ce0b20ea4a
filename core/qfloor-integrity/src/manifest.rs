//! The on-disk manifest document.

use crate::error::{IntegrityError, VerifierResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// The only digest algorithm manifests may declare.
pub const MANIFEST_ALGORITHM: &str = "sha256";

/// Default manifest file name inside a base directory.
pub const DEFAULT_MANIFEST_NAME: &str = "integrity.json";

/// `{"algorithm": "sha256", "files": {path: hex}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub algorithm: String,
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

impl Manifest {
    pub fn new(files: BTreeMap<String, String>) -> Self {
        Self {
            algorithm: MANIFEST_ALGORITHM.to_string(),
            files,
        }
    }

    /// Reads and validates a manifest document.
    pub fn load(path: impl AsRef<Path>) -> VerifierResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(IntegrityError::NotFound(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        let manifest: Manifest = serde_json::from_str(&raw)
            .map_err(|e| IntegrityError::InvalidFormat(e.to_string()))?;

        if !manifest.algorithm.eq_ignore_ascii_case(MANIFEST_ALGORITHM) {
            return Err(IntegrityError::InvalidFormat(format!(
                "unsupported algorithm '{}'",
                manifest.algorithm
            )));
        }
        Ok(manifest)
    }

    /// Writes the manifest as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> VerifierResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| IntegrityError::InvalidFormat(e.to_string()))?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}
