//! Manifest-backed file verification.

use crate::error::{IntegrityError, VerifierResult};
use crate::hash::hash_file;
use crate::manifest::{DEFAULT_MANIFEST_NAME, Manifest};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default pattern for directory scans: every file, recursively.
pub const DEFAULT_PATTERN: &str = "**/*";

/// Outcome of checking one file against its expected digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityResult {
    pub path: PathBuf,
    pub is_valid: bool,
    pub expected_hash: String,
    pub actual_hash: Option<String>,
    pub error: Option<String>,
}

/// Hashes files relative to a base directory and checks them against an
/// in-memory manifest.
#[derive(Debug, Clone)]
pub struct IntegrityVerifier {
    base_path: PathBuf,
    manifest: BTreeMap<String, String>,
}

impl Default for IntegrityVerifier {
    fn default() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(cwd)
    }
}

impl IntegrityVerifier {
    /// Creates a verifier that resolves relative paths against `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            manifest: BTreeMap::new(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// The manifest currently held in memory.
    pub fn manifest(&self) -> &BTreeMap<String, String> {
        &self.manifest
    }

    /// Path of `integrity.json` under the base directory.
    pub fn default_manifest_path(&self) -> PathBuf {
        self.base_path.join(DEFAULT_MANIFEST_NAME)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    /// Hex SHA-256 of a file, resolved against the base path.
    pub fn calculate_hash(&self, path: impl AsRef<Path>) -> VerifierResult<String> {
        hash_file(self.resolve(path.as_ref()))
    }

    /// Checks one file. Never fails: problems are reported in the result.
    pub fn verify_file(&self, path: impl AsRef<Path>, expected_hash: &str) -> IntegrityResult {
        let resolved = self.resolve(path.as_ref());
        let mut result = IntegrityResult {
            path: resolved.clone(),
            is_valid: false,
            expected_hash: expected_hash.to_string(),
            actual_hash: None,
            error: None,
        };

        if !resolved.exists() {
            result.error = Some("File not found".to_string());
            return result;
        }

        match hash_file(&resolved) {
            Ok(actual) => {
                result.is_valid = actual.eq_ignore_ascii_case(expected_hash);
                result.actual_hash = Some(actual);
            }
            Err(e) => result.error = Some(e.to_string()),
        }
        debug!("verified {:?}: valid={}", resolved, result.is_valid);
        result
    }

    /// Hashes each path and replaces the in-memory manifest.
    ///
    /// Paths are stored as given. A path that cannot be hashed is skipped
    /// with a warning.
    pub fn create_manifest<I, P>(&mut self, paths: I) -> &BTreeMap<String, String>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut files = BTreeMap::new();
        for path in paths {
            let path = path.as_ref();
            match self.calculate_hash(path) {
                Ok(digest) => {
                    files.insert(path.to_string_lossy().into_owned(), digest);
                }
                Err(e) => warn!("skipping {:?} in manifest: {}", path, e),
            }
        }
        self.manifest = files;
        &self.manifest
    }

    /// Writes the in-memory manifest, to `integrity.json` under the base
    /// path when no location is given.
    pub fn save_manifest(&self, path: Option<&Path>) -> VerifierResult<PathBuf> {
        let target = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_manifest_path());
        Manifest::new(self.manifest.clone()).save(&target)?;
        info!("saved manifest with {} entries to {:?}", self.manifest.len(), target);
        Ok(target)
    }

    /// Loads a manifest document into memory.
    pub fn load_manifest(
        &mut self,
        path: Option<&Path>,
    ) -> VerifierResult<&BTreeMap<String, String>> {
        let source = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_manifest_path());
        self.manifest = Manifest::load(&source)?.files;
        Ok(&self.manifest)
    }

    /// Loads a manifest and verifies every entry in it.
    pub fn verify_manifest(
        &mut self,
        path: Option<&Path>,
    ) -> VerifierResult<(bool, Vec<IntegrityResult>)> {
        self.load_manifest(path)?;
        let results: Vec<IntegrityResult> = self
            .manifest
            .iter()
            .map(|(file, expected)| self.verify_file(file, expected))
            .collect();
        let all_valid = results.iter().all(|r| r.is_valid);
        Ok((all_valid, results))
    }

    /// Verifies the files under `dir` that match `patterns` (default
    /// [`DEFAULT_PATTERN`]) against the in-memory manifest.
    ///
    /// Files without a manifest entry are skipped.
    pub fn verify_directory(
        &self,
        dir: impl AsRef<Path>,
        patterns: Option<&[&str]>,
    ) -> VerifierResult<(bool, Vec<IntegrityResult>)> {
        let dir = self.resolve(dir.as_ref());
        let files = find_files(&dir, patterns.unwrap_or(&[DEFAULT_PATTERN]))?;

        let expected: HashMap<PathBuf, &String> = self
            .manifest
            .iter()
            .map(|(file, digest)| (self.resolve(Path::new(file)), digest))
            .collect();

        let results: Vec<IntegrityResult> = files
            .iter()
            .filter_map(|file| expected.get(file).map(|digest| self.verify_file(file, digest)))
            .collect();
        let all_valid = results.iter().all(|r| r.is_valid);
        Ok((all_valid, results))
    }
}

/// Regular files under `dir` matching any of `patterns`, deduplicated.
fn find_files(dir: &Path, patterns: &[&str]) -> VerifierResult<BTreeSet<PathBuf>> {
    let root = glob::Pattern::escape(&dir.to_string_lossy());
    let mut files = BTreeSet::new();

    for pattern in patterns {
        let full = format!("{}/{}", root.trim_end_matches('/'), pattern);
        let entries = glob::glob(&full).map_err(|e| IntegrityError::Pattern(e.to_string()))?;
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => {
                    files.insert(path);
                }
                Ok(_) => {}
                Err(e) => warn!("unreadable entry during scan: {}", e),
            }
        }
    }
    Ok(files)
}

/// Hashes every file under `dist` and saves the manifest, to
/// `dist/integrity.json` unless `output` is given.
///
/// Entries are stored relative to `dist`. The manifest file itself is
/// excluded.
pub fn create_distribution_manifest(
    dist: impl AsRef<Path>,
    output: Option<&Path>,
) -> VerifierResult<BTreeMap<String, String>> {
    let dist = dist.as_ref();
    let mut verifier = IntegrityVerifier::new(dist);
    let target = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| verifier.default_manifest_path());

    let relative: Vec<PathBuf> = find_files(dist, &[DEFAULT_PATTERN])?
        .into_iter()
        .filter(|file| *file != target)
        .filter_map(|file| file.strip_prefix(dist).ok().map(Path::to_path_buf))
        .collect();

    let manifest = verifier.create_manifest(&relative).clone();
    verifier.save_manifest(Some(&target))?;
    Ok(manifest)
}

/// Verifies a distribution against `dist/integrity.json`.
pub fn verify_distribution(
    dist: impl AsRef<Path>,
) -> VerifierResult<(bool, Vec<IntegrityResult>)> {
    IntegrityVerifier::new(dist.as_ref()).verify_manifest(None)
}
