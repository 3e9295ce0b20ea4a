//! `protection.toml`.

use crate::error::{RuntimeError, RuntimeResult};
use qfloor_guard::TriggerAction;
use qfloor_license::DEFAULT_LICENSE_ENV;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_DIR: &str = ".quantum_floor";
pub const CONFIG_FILE: &str = "protection.toml";

/// Top-level configuration. Every section may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionConfig {
    #[serde(default)]
    pub license: LicenseSection,
    #[serde(default)]
    pub integrity: IntegritySection,
    #[serde(default)]
    pub guard: GuardSection,
    #[serde(default)]
    pub locks: Vec<LockEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseSection {
    #[serde(default = "default_env_var")]
    pub env_var: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_env_var() -> String {
    DEFAULT_LICENSE_ENV.to_string()
}

impl Default for LicenseSection {
    fn default() -> Self {
        Self {
            env_var: default_env_var(),
            file: None,
        }
    }
}

/// Where relative paths in the rest of the file are anchored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegritySection {
    /// Defaults to the working directory.
    #[serde(default)]
    pub base_path: Option<PathBuf>,
    /// Defaults to `integrity.json` under the base path.
    #[serde(default)]
    pub manifest: Option<PathBuf>,
}

impl IntegritySection {
    pub fn base_path(&self) -> PathBuf {
        match &self.base_path {
            Some(base) => base.clone(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Joins a relative `path` onto the base path. Absolute paths pass
    /// through.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path().join(path)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    #[default]
    Terminate,
    Log,
    SecureDelete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardSection {
    #[serde(default)]
    pub protected_paths: Vec<PathBuf>,
    #[serde(default)]
    pub action: ActionKind,
    #[serde(default = "default_exit_code")]
    pub exit_code: i32,
    #[serde(default = "default_check_debugger")]
    pub check_debugger: bool,
}

fn default_exit_code() -> i32 {
    1
}

fn default_check_debugger() -> bool {
    true
}

impl Default for GuardSection {
    fn default() -> Self {
        Self {
            protected_paths: Vec::new(),
            action: ActionKind::default(),
            exit_code: default_exit_code(),
            check_debugger: default_check_debugger(),
        }
    }
}

impl GuardSection {
    pub fn trigger_action(&self) -> TriggerAction {
        match self.action {
            ActionKind::Terminate => TriggerAction::Terminate {
                exit_code: self.exit_code,
            },
            ActionKind::Log => TriggerAction::Log,
            ActionKind::SecureDelete => TriggerAction::SecureDelete,
        }
    }
}

/// One `[[locks]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    pub model: String,
    pub path: PathBuf,
}

impl ProtectionConfig {
    /// `~/.quantum_floor/protection.toml`, or a relative path when no home
    /// directory is known.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|home| home.join(CONFIG_DIR))
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR))
            .join(CONFIG_FILE)
    }

    /// Loads from [`default_path`](Self::default_path).
    pub fn load() -> RuntimeResult<Self> {
        Self::load_from(Self::default_path())
    }

    /// Loads from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::Config`] if the file is not valid TOML for this
    /// schema.
    pub fn load_from(path: impl AsRef<Path>) -> RuntimeResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("no protection config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        info!("loaded protection config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> RuntimeResult<Self> {
        toml::from_str(contents).map_err(|e| RuntimeError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> RuntimeResult<String> {
        toml::to_string_pretty(self).map_err(|e| RuntimeError::Config(e.to_string()))
    }
}
