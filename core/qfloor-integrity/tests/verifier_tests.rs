use pretty_assertions::assert_eq;
use qfloor_integrity::{
    IntegrityError, IntegrityVerifier, Manifest, create_distribution_manifest, hash_bytes,
    hash_file, verify_distribution,
};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &[u8]) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

// ── hashing ──────────────────────────────────────────────────────

#[test]
fn hash_is_stable_across_calls() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "model.bin", b"weights");
    let path = dir.path().join("model.bin");

    assert_eq!(hash_file(&path).unwrap(), hash_file(&path).unwrap());
    assert_eq!(hash_file(&path).unwrap(), hash_bytes(b"weights"));
}

#[test]
fn hash_changes_after_append() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "model.bin", b"weights");
    let path = dir.path().join("model.bin");
    let before = hash_file(&path).unwrap();

    let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"!").unwrap();
    drop(file);

    assert_ne!(before, hash_file(&path).unwrap());
}

#[test]
fn hash_spans_multiple_chunks() {
    let dir = TempDir::new().unwrap();
    let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    write(dir.path(), "big.bin", &data);
    assert_eq!(hash_file(dir.path().join("big.bin")).unwrap(), hash_bytes(&data));
}

#[test]
fn hash_missing_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = hash_file(dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, IntegrityError::NotFound(_)));
}

// ── verify_file ──────────────────────────────────────────────────

#[test]
fn verify_file_matches_expected_digest() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.txt", b"alpha");
    let verifier = IntegrityVerifier::new(dir.path());

    let result = verifier.verify_file("a.txt", &hash_bytes(b"alpha"));
    assert!(result.is_valid);
    assert_eq!(result.path, dir.path().join("a.txt"));
    assert_eq!(result.actual_hash.as_deref(), Some(hash_bytes(b"alpha").as_str()));
    assert_eq!(result.error, None);
}

#[test]
fn verify_file_detects_mismatch() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.txt", b"alpha");
    let verifier = IntegrityVerifier::new(dir.path());

    let result = verifier.verify_file("a.txt", &hash_bytes(b"beta"));
    assert!(!result.is_valid);
    assert!(result.actual_hash.is_some());
}

#[test]
fn verify_missing_file_reports_error() {
    let dir = TempDir::new().unwrap();
    let verifier = IntegrityVerifier::new(dir.path());

    let result = verifier.verify_file("gone.bin", "00");
    assert!(!result.is_valid);
    assert_eq!(result.error.as_deref(), Some("File not found"));
    assert_eq!(result.actual_hash, None);
}

// ── manifests ────────────────────────────────────────────────────

#[test]
fn create_manifest_skips_unreadable_paths() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.txt", b"alpha");
    let mut verifier = IntegrityVerifier::new(dir.path());

    let manifest = verifier.create_manifest(["a.txt", "missing.txt"]);
    assert_eq!(manifest.len(), 1);
    assert_eq!(manifest["a.txt"], hash_bytes(b"alpha"));
}

#[test]
fn manifest_save_load_verify() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.txt", b"alpha");
    write(dir.path(), "sub/b.txt", b"beta");

    let mut verifier = IntegrityVerifier::new(dir.path());
    verifier.create_manifest(["a.txt", "sub/b.txt"]);
    let saved = verifier.save_manifest(None).unwrap();
    assert_eq!(saved, dir.path().join("integrity.json"));

    let mut fresh = IntegrityVerifier::new(dir.path());
    let (ok, results) = fresh.verify_manifest(None).unwrap();
    assert!(ok);
    assert_eq!(results.len(), 2);

    write(dir.path(), "sub/b.txt", b"BETA");
    let (ok, results) = fresh.verify_manifest(None).unwrap();
    assert!(!ok);
    assert_eq!(results.iter().filter(|r| !r.is_valid).count(), 1);
}

#[test]
fn saved_manifest_document_shape() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.txt", b"alpha");
    let mut verifier = IntegrityVerifier::new(dir.path());
    verifier.create_manifest(["a.txt"]);
    let path = verifier.save_manifest(None).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(value["algorithm"], "sha256");
    assert_eq!(value["files"]["a.txt"], hash_bytes(b"alpha"));
}

#[test]
fn load_rejects_unknown_algorithm() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("integrity.json");
    fs::write(&path, r#"{"algorithm": "md5", "files": {}}"#).unwrap();

    let err = Manifest::load(&path).unwrap_err();
    assert!(matches!(err, IntegrityError::InvalidFormat(_)));
}

#[test]
fn load_rejects_non_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("integrity.json");
    fs::write(&path, "not json").unwrap();

    let mut verifier = IntegrityVerifier::new(dir.path());
    assert!(matches!(
        verifier.load_manifest(None),
        Err(IntegrityError::InvalidFormat(_))
    ));
}

#[test]
fn load_missing_manifest_is_not_found() {
    let dir = TempDir::new().unwrap();
    let mut verifier = IntegrityVerifier::new(dir.path());
    assert!(matches!(
        verifier.verify_manifest(None),
        Err(IntegrityError::NotFound(_))
    ));
}

#[test]
fn load_defaults_files_to_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("m.json");
    fs::write(&path, r#"{"algorithm": "sha256"}"#).unwrap();

    let manifest = Manifest::load(&path).unwrap();
    assert_eq!(manifest.files, BTreeMap::new());
}

// ── verify_directory ─────────────────────────────────────────────

#[test]
fn verify_directory_skips_files_outside_manifest() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "dist/a.bin", b"a");
    write(dir.path(), "dist/nested/b.bin", b"b");
    write(dir.path(), "dist/extra.bin", b"x");

    let mut verifier = IntegrityVerifier::new(dir.path());
    verifier.create_manifest(["dist/a.bin", "dist/nested/b.bin"]);

    let (ok, results) = verifier.verify_directory("dist", None).unwrap();
    assert!(ok);
    assert_eq!(results.len(), 2);
}

#[test]
fn verify_directory_reports_modified_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "dist/a.bin", b"a");
    write(dir.path(), "dist/b.txt", b"b");

    let mut verifier = IntegrityVerifier::new(dir.path());
    verifier.create_manifest(["dist/a.bin", "dist/b.txt"]);
    write(dir.path(), "dist/a.bin", b"tampered");

    let (ok, results) = verifier.verify_directory("dist", Some(&["*.bin"][..])).unwrap();
    assert!(!ok);
    assert_eq!(results.len(), 1);
    assert!(results[0].path.ends_with("a.bin"));
}

#[test]
fn verify_directory_rejects_bad_pattern() {
    let dir = TempDir::new().unwrap();
    let verifier = IntegrityVerifier::new(dir.path());
    let err = verifier.verify_directory(".", Some(&["[unclosed"][..])).unwrap_err();
    assert!(matches!(err, IntegrityError::Pattern(_)));
}

// ── distributions ────────────────────────────────────────────────

#[test]
fn distribution_manifest_roundtrip() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "model.bin", b"weights");
    write(dir.path(), "config/tokenizer.json", b"{}");

    let manifest = create_distribution_manifest(dir.path(), None).unwrap();
    assert_eq!(manifest.len(), 2);
    assert!(!manifest.keys().any(|k| k.ends_with("integrity.json")));

    let (ok, results) = verify_distribution(dir.path()).unwrap();
    assert!(ok);
    assert_eq!(results.len(), 2);
}

#[test]
fn distribution_detects_deleted_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "model.bin", b"weights");
    create_distribution_manifest(dir.path(), None).unwrap();

    fs::remove_file(dir.path().join("model.bin")).unwrap();
    let (ok, results) = verify_distribution(dir.path()).unwrap();
    assert!(!ok);
    assert_eq!(results[0].error.as_deref(), Some("File not found"));
}

#[test]
fn distribution_manifest_to_custom_output() {
    let dist = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write(dist.path(), "model.bin", b"weights");
    let target = out.path().join("manifest.json");

    create_distribution_manifest(dist.path(), Some(&target)).unwrap();
    assert!(target.exists());
    assert!(!dist.path().join("integrity.json").exists());

    let mut verifier = IntegrityVerifier::new(dist.path());
    let (ok, _) = verifier.verify_manifest(Some(&target)).unwrap();
    assert!(ok);
}
