//! Machine identity for activation.
//!
//! The fingerprint is the `machine_id` sent to the activation service. It
//! hashes stable host identifiers, so it survives restarts and changes when
//! the machine does.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;

/// Domain separator mixed into every fingerprint.
const FINGERPRINT_CONTEXT: &[u8] = b"qfloor-machine-v1";

/// A stable identifier for the current machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFingerprint {
    id: String,
}

impl DeviceFingerprint {
    /// Fingerprints the current machine.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_components(&host_components())
    }

    /// Fingerprints an explicit list of identifiers.
    #[must_use]
    pub fn from_components<S: AsRef<str>>(components: &[S]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_CONTEXT);
        for component in components {
            let bytes = component.as_ref().as_bytes();
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }
        let digest = hasher.finalize();
        Self {
            id: URL_SAFE_NO_PAD.encode(&digest[..18]),
        }
    }

    /// The fingerprint string, 24 base64url characters.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// True when this fingerprint was taken on the current machine.
    #[must_use]
    pub fn matches_current(&self) -> bool {
        *self == Self::generate()
    }
}

impl std::fmt::Display for DeviceFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

fn host_components() -> Vec<String> {
    let mut ids = vec![env::consts::OS.to_string(), env::consts::ARCH.to_string()];

    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    ids.push(host);

    if let Some(machine_id) = platform_machine_id() {
        ids.push(machine_id);
    }
    ids
}

#[cfg(target_os = "linux")]
fn platform_machine_id() -> Option<String> {
    ["/etc/machine-id", "/var/lib/dbus/machine-id"]
        .iter()
        .find_map(|p| std::fs::read_to_string(p).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(target_os = "macos")]
fn platform_machine_id() -> Option<String> {
    let output = std::process::Command::new("ioreg")
        .args(["-rd1", "-c", "IOPlatformExpertDevice"])
        .output()
        .ok()?;
    String::from_utf8(output.stdout)
        .ok()?
        .lines()
        .find(|l| l.contains("IOPlatformUUID"))
        .and_then(|l| l.split('"').nth(3))
        .map(String::from)
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn platform_machine_id() -> Option<String> {
    None
}
