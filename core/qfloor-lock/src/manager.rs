use crate::error::{LockError, LockResult};
use crate::lock::QuantumLock;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

/// Registry of locks keyed by model name.
///
/// Not synchronized. Share it behind a mutex.
#[derive(Debug, Default)]
pub struct QuantumLockManager {
    locks: BTreeMap<String, QuantumLock>,
}

impl QuantumLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the artifact at `path` and registers it under `model`,
    /// replacing any earlier registration.
    pub fn register(&mut self, model: &str, path: impl Into<PathBuf>) -> LockResult<()> {
        let lock = QuantumLock::open(path, model)?;
        self.insert(lock);
        Ok(())
    }

    pub fn insert(&mut self, lock: QuantumLock) {
        info!("registered lock for {}", lock.model_name());
        self.locks.insert(lock.model_name().to_string(), lock);
    }

    pub fn get(&self, model: &str) -> Option<&QuantumLock> {
        self.locks.get(model)
    }

    pub fn get_mut(&mut self, model: &str) -> Option<&mut QuantumLock> {
        self.locks.get_mut(model)
    }

    /// Like [`get_mut`](Self::get_mut) but an unknown model is an error.
    pub fn require_mut(&mut self, model: &str) -> LockResult<&mut QuantumLock> {
        self.locks
            .get_mut(model)
            .ok_or_else(|| LockError::ModelNotRegistered(model.to_string()))
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.locks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Runs `verify_license` on every lock.
    pub fn verify_all(&mut self, license_key: &str) -> BTreeMap<String, bool> {
        self.locks
            .iter_mut()
            .map(|(model, lock)| (model.clone(), lock.verify_license(license_key)))
            .collect()
    }

    /// Flags every lock as tampered.
    pub fn flag_all(&mut self, reason: &str) {
        for lock in self.locks.values_mut() {
            lock.raise_tamper(reason);
        }
    }

    /// Closes every lock and empties the registry.
    pub fn close_all(&mut self) {
        for lock in self.locks.values_mut() {
            lock.close();
        }
        self.locks.clear();
    }
}
