use qfloor_crypto::{
    CipherManager, CryptoError, ENCODED_KEY_LEN, KdfParams, KeyMaterial, Salt,
    decrypt_model_to_memory, encrypt, encrypt_model,
};
use std::fs;
use tempfile::TempDir;

fn fast_manager() -> CipherManager {
    CipherManager::with_kdf_params(KdfParams { iterations: 1_000 })
}

// ── initialization ───────────────────────────────────────────────

#[test]
fn new_manager_is_uninitialized() {
    let manager = CipherManager::new();
    assert!(!manager.is_initialized());
    assert!(!manager.has_rotation());
    assert!(matches!(
        manager.encrypt(b"data"),
        Err(CryptoError::NotInitialized)
    ));
    assert!(matches!(
        manager.decrypt(b"data"),
        Err(CryptoError::NotInitialized)
    ));
}

#[test]
fn generate_key_initializes() {
    let mut manager = CipherManager::new();
    let key = manager.generate_key();
    assert!(manager.is_initialized());

    let token = manager.encrypt(b"payload").unwrap();
    assert_eq!(qfloor_crypto::decrypt(&key, &token).unwrap(), b"payload");
}

#[test]
fn load_key_replaces_previous_key() {
    let mut manager = CipherManager::new();
    manager.generate_key();
    let token_a = manager.encrypt(b"a").unwrap();

    manager.load_key(KeyMaterial::generate());
    assert!(manager.decrypt(&token_a).is_err());
}

#[test]
fn clear_drops_keys() {
    let dir = TempDir::new().unwrap();
    let sealed = dir.path().join("sealed.enc");

    let mut manager = CipherManager::new();
    manager.generate_key();
    let token = manager.encrypt(b"x").unwrap();
    fs::write(&sealed, &token).unwrap();
    manager.clear();

    assert!(!manager.is_initialized());
    assert!(matches!(
        manager.encrypt(b"x"),
        Err(CryptoError::NotInitialized)
    ));
    assert!(matches!(
        manager.decrypt(&token),
        Err(CryptoError::NotInitialized)
    ));
    assert!(matches!(
        manager.decrypt_to_memory(&sealed),
        Err(CryptoError::NotInitialized)
    ));
    assert!(matches!(
        manager.save_key_to_file(dir.path().join("k")),
        Err(CryptoError::NotInitialized)
    ));
}

#[test]
fn clear_after_rotation_reports_not_initialized() {
    let old = KeyMaterial::generate();
    let old_token = encrypt(&old, b"legacy").unwrap();

    let mut manager = CipherManager::new();
    manager.setup_key_rotation(KeyMaterial::generate(), vec![old]);
    manager.clear();

    assert!(!manager.has_rotation());
    assert!(matches!(
        manager.rotate_encrypt(&old_token),
        Err(CryptoError::NotInitialized)
    ));
}

// ── password derivation ──────────────────────────────────────────

#[test]
fn password_derivation_with_same_salt_is_reproducible() {
    let mut first = fast_manager();
    let (key1, salt) = first.derive_key_from_password("hunter2", None).unwrap();
    let token = first.encrypt(b"model weights").unwrap();

    let mut second = fast_manager();
    let (key2, salt2) = second
        .derive_key_from_password("hunter2", Some(salt.clone()))
        .unwrap();

    assert_eq!(key1, key2);
    assert_eq!(salt, salt2);
    assert_eq!(second.decrypt(&token).unwrap(), b"model weights");
}

#[test]
fn password_derivation_generates_fresh_salt() {
    let mut manager = fast_manager();
    let (_, s1) = manager.derive_key_from_password("pw", None).unwrap();
    let (_, s2) = manager.derive_key_from_password("pw", None).unwrap();
    assert_ne!(s1, s2);
}

#[test]
fn wrong_password_cannot_decrypt() {
    let salt = Salt::random();
    let mut right = fast_manager();
    right.derive_key_from_password("right", Some(salt.clone())).unwrap();
    let token = right.encrypt(b"secret").unwrap();

    let mut wrong = fast_manager();
    wrong.derive_key_from_password("wrong", Some(salt)).unwrap();
    assert!(matches!(
        wrong.decrypt(&token),
        Err(CryptoError::DecryptionFailed)
    ));
}

// ── rotation ─────────────────────────────────────────────────────

#[test]
fn rotation_accepts_old_tokens() {
    let old = KeyMaterial::generate();
    let old_token = encrypt(&old, b"legacy").unwrap();

    let new = KeyMaterial::generate();
    let mut manager = CipherManager::new();
    manager.setup_key_rotation(new.clone(), vec![old]);

    assert!(manager.has_rotation());
    assert_eq!(manager.decrypt(&old_token).unwrap(), b"legacy");

    let fresh = manager.encrypt(b"fresh").unwrap();
    assert_eq!(qfloor_crypto::decrypt(&new, &fresh).unwrap(), b"fresh");
}

#[test]
fn rotate_encrypt_moves_token_to_new_key() {
    let old = KeyMaterial::generate();
    let old_token = encrypt(&old, b"legacy").unwrap();

    let new = KeyMaterial::generate();
    let mut manager = CipherManager::new();
    manager.setup_key_rotation(new.clone(), vec![old.clone()]);

    let rotated = manager.rotate_encrypt(&old_token).unwrap();
    assert_eq!(qfloor_crypto::decrypt(&new, &rotated).unwrap(), b"legacy");
    assert!(qfloor_crypto::decrypt(&old, &rotated).is_err());
}

#[test]
fn rotate_encrypt_requires_rotation_setup() {
    let mut manager = CipherManager::new();
    manager.generate_key();
    let token = manager.encrypt(b"x").unwrap();
    assert!(matches!(
        manager.rotate_encrypt(&token),
        Err(CryptoError::RotationNotConfigured)
    ));
}

#[test]
fn rotate_encrypt_rejects_foreign_token() {
    let mut manager = CipherManager::new();
    manager.setup_key_rotation(KeyMaterial::generate(), vec![KeyMaterial::generate()]);
    let foreign = encrypt(&KeyMaterial::generate(), b"x").unwrap();
    assert!(matches!(
        manager.rotate_encrypt(&foreign),
        Err(CryptoError::DecryptionFailed)
    ));
}

#[test]
fn loading_a_key_resets_rotation() {
    let old = KeyMaterial::generate();
    let old_token = encrypt(&old, b"legacy").unwrap();

    let mut manager = CipherManager::new();
    manager.setup_key_rotation(KeyMaterial::generate(), vec![old]);
    manager.generate_key();

    assert!(!manager.has_rotation());
    assert!(manager.decrypt(&old_token).is_err());
}

// ── key files ────────────────────────────────────────────────────

#[test]
fn key_file_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.key");

    let mut manager = CipherManager::new();
    let key = manager.generate_key();
    manager.save_key_to_file(&path).unwrap();

    let on_disk = fs::read(&path).unwrap();
    assert_eq!(on_disk.len(), ENCODED_KEY_LEN);

    let mut loaded = CipherManager::new();
    loaded.load_key_from_file(&path).unwrap();
    let token = loaded.encrypt(b"x").unwrap();
    assert_eq!(qfloor_crypto::decrypt(&key, &token).unwrap(), b"x");
}

#[test]
fn save_key_without_key_fails() {
    let dir = TempDir::new().unwrap();
    let manager = CipherManager::new();
    assert!(matches!(
        manager.save_key_to_file(dir.path().join("k")),
        Err(CryptoError::NotInitialized)
    ));
}

#[test]
fn load_key_from_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let mut manager = CipherManager::new();
    assert!(matches!(
        manager.load_key_from_file(dir.path().join("absent.key")),
        Err(CryptoError::Io(_))
    ));
}

#[test]
fn load_key_from_garbage_file_is_invalid_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.key");
    fs::write(&path, b"not a key").unwrap();

    let mut manager = CipherManager::new();
    assert!(matches!(
        manager.load_key_from_file(&path),
        Err(CryptoError::InvalidKey(_))
    ));
    assert!(!manager.is_initialized());
}

// ── file encryption ──────────────────────────────────────────────

#[test]
fn file_encrypt_decrypt_roundtrip() {
    let dir = TempDir::new().unwrap();
    let plain = dir.path().join("model.bin");
    let sealed = dir.path().join("model.bin.enc");
    let restored = dir.path().join("model.out");
    fs::write(&plain, b"weights and biases").unwrap();

    let mut manager = CipherManager::new();
    manager.generate_key();
    manager.encrypt_file(&plain, &sealed).unwrap();
    assert_ne!(fs::read(&sealed).unwrap(), b"weights and biases");

    manager.decrypt_file(&sealed, &restored).unwrap();
    assert_eq!(fs::read(&restored).unwrap(), b"weights and biases");

    let in_memory = manager.decrypt_to_memory(&sealed).unwrap();
    assert_eq!(in_memory.as_slice(), b"weights and biases");
}

#[test]
fn encrypt_model_generates_key_when_absent() {
    let dir = TempDir::new().unwrap();
    let plain = dir.path().join("m.bin");
    let sealed = dir.path().join("m.enc");
    fs::write(&plain, b"model").unwrap();

    let key = encrypt_model(&plain, &sealed, None).unwrap();
    let decrypted = decrypt_model_to_memory(&sealed, key).unwrap();
    assert_eq!(decrypted.as_slice(), b"model");
}

#[test]
fn encrypt_model_uses_supplied_key() {
    let dir = TempDir::new().unwrap();
    let plain = dir.path().join("m.bin");
    let sealed = dir.path().join("m.enc");
    fs::write(&plain, b"model").unwrap();

    let key = KeyMaterial::generate();
    let returned = encrypt_model(&plain, &sealed, Some(key.clone())).unwrap();
    assert_eq!(returned, key);

    let wrong = decrypt_model_to_memory(&sealed, KeyMaterial::generate());
    assert!(matches!(wrong, Err(CryptoError::DecryptionFailed)));
}
