//! The protection context: one owner for every component of a process.

use crate::config::ProtectionConfig;
use crate::error::{RuntimeError, RuntimeResult};
use qfloor_crypto::Zeroizing;
use qfloor_guard::{NullProbe, SelfDestructSystem, Severity, TamperEvent, TriggerAction};
use qfloor_integrity::{IntegrityResult, IntegrityVerifier};
use qfloor_license::{
    LicenseChecker, LicenseError, UsageStats, read_env_license, read_license_file,
};
use qfloor_lock::{LockStatus, QuantumLockManager};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info};

/// Owns the lock registry, the license checker, the tamper guard and an
/// integrity verifier, and wires the guard to the locks.
///
/// Every method takes `&self`; the context is `Send + Sync` and can be
/// shared behind an `Arc`.
pub struct ProtectionContext {
    config: ProtectionConfig,
    locks: Arc<Mutex<QuantumLockManager>>,
    license: Arc<Mutex<LicenseChecker>>,
    guard: Arc<Mutex<SelfDestructSystem>>,
    verifier: Mutex<IntegrityVerifier>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ProtectionContext {
    /// Builds a context with the trigger action named in `config`.
    pub fn new(config: ProtectionConfig) -> RuntimeResult<Self> {
        let action = config.guard.trigger_action();
        Self::with_trigger_action(config, action)
    }

    /// Builds a context with an explicit trigger action.
    ///
    /// # Errors
    ///
    /// Fails if a configured lock artifact is missing or malformed.
    pub fn with_trigger_action(
        config: ProtectionConfig,
        action: TriggerAction,
    ) -> RuntimeResult<Self> {
        let mut manager = QuantumLockManager::new();
        for entry in &config.locks {
            manager.register(&entry.model, config.integrity.resolve(&entry.path))?;
        }
        let locks = Arc::new(Mutex::new(manager));

        let mut guard = SelfDestructSystem::new().with_action(action);
        if !config.guard.check_debugger {
            guard = guard.with_probe(NullProbe);
        }
        let registry = Arc::clone(&locks);
        guard.add_callback(move |event: &TamperEvent| {
            if event.severity >= Severity::Critical {
                error!("flagging all locks after {}", event.event_type);
                lock(&registry).flag_all(&event.details);
            }
        });

        let verifier = IntegrityVerifier::new(config.integrity.base_path());
        info!("protection context ready with {} locks", config.locks.len());

        Ok(Self {
            config,
            locks,
            license: Arc::new(Mutex::new(LicenseChecker::new())),
            guard: Arc::new(Mutex::new(guard)),
            verifier: Mutex::new(verifier),
        })
    }

    pub fn config(&self) -> &ProtectionConfig {
        &self.config
    }

    pub fn locks(&self) -> Arc<Mutex<QuantumLockManager>> {
        Arc::clone(&self.locks)
    }

    pub fn license(&self) -> Arc<Mutex<LicenseChecker>> {
        Arc::clone(&self.license)
    }

    pub fn guard(&self) -> Arc<Mutex<SelfDestructSystem>> {
        Arc::clone(&self.guard)
    }

    /// Validates `license_key` and binds it to every registered lock.
    ///
    /// # Errors
    ///
    /// [`LicenseError::MalformedKey`] or [`LicenseError::Expired`], wrapped.
    pub fn unlock(&self, license_key: &str) -> RuntimeResult<BTreeMap<String, bool>> {
        let info = lock(&self.license).check_license_key(license_key)?;
        if !info.is_valid {
            return Err(LicenseError::Expired(info.expires.to_string()).into());
        }
        Ok(lock(&self.locks).verify_all(license_key))
    }

    /// [`unlock`](Self::unlock) with the key from the configured
    /// environment variable.
    pub fn unlock_from_env(&self) -> RuntimeResult<BTreeMap<String, bool>> {
        let key = read_env_license(&self.config.license.env_var)?;
        self.unlock(&key)
    }

    /// [`unlock`](Self::unlock) with the key from the configured license
    /// file.
    pub fn unlock_from_file(&self) -> RuntimeResult<BTreeMap<String, bool>> {
        let file = self
            .config
            .license
            .file
            .as_deref()
            .ok_or_else(|| RuntimeError::Config("no license file configured".to_string()))?;
        let key = read_license_file(self.config.integrity.resolve(file))?;
        self.unlock(&key)
    }

    /// Encrypts `data` with the lock registered for `model`.
    pub fn encrypt(&self, model: &str, data: &[u8]) -> RuntimeResult<Vec<u8>> {
        let mut locks = lock(&self.locks);
        Ok(locks.require_mut(model)?.encrypt(data)?)
    }

    /// Decrypts `token` with the lock registered for `model`.
    ///
    /// The request counts against the license quota only once the license
    /// gate passes and the lock is verified and unflagged.
    pub fn decrypt(&self, model: &str, token: &[u8]) -> RuntimeResult<Zeroizing<Vec<u8>>> {
        lock(&self.license).check_request()?;
        let mut locks = lock(&self.locks);
        let target = locks.require_mut(model)?;
        target.ensure_ready()?;
        lock(&self.license).authorize_request()?;
        Ok(target.decrypt(token)?)
    }

    /// Arms the guard over the configured protected paths.
    pub fn arm_guard(&self) -> RuntimeResult<()> {
        let paths: Vec<_> = self
            .config
            .guard
            .protected_paths
            .iter()
            .map(|p| self.config.integrity.resolve(p))
            .collect();
        lock(&self.guard).arm(paths)?;
        Ok(())
    }

    pub fn disarm_guard(&self) {
        lock(&self.guard).disarm();
    }

    /// Runs the guard checks. The debugger probe is skipped when disabled in
    /// the configuration.
    pub fn check(&self) -> bool {
        lock(&self.guard).run_checks()
    }

    pub fn events(&self) -> Vec<TamperEvent> {
        lock(&self.guard).events()
    }

    /// Verifies the configured manifest, or `integrity.json` under the base
    /// path.
    pub fn verify_manifest(&self) -> RuntimeResult<(bool, Vec<IntegrityResult>)> {
        let manifest = self
            .config
            .integrity
            .manifest
            .as_deref()
            .map(|p| self.config.integrity.resolve(p));
        Ok(lock(&self.verifier).verify_manifest(manifest.as_deref())?)
    }

    pub fn usage(&self) -> UsageStats {
        lock(&self.license).usage()
    }

    pub fn status(&self) -> BTreeMap<String, LockStatus> {
        let locks = lock(&self.locks);
        locks
            .models()
            .filter_map(|model| locks.get(model).map(|l| (model.to_string(), l.status())))
            .collect()
    }
}
