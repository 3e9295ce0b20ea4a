use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const EVENT_FILE_MISSING: &str = "file_missing";
pub const EVENT_FILE_MODIFIED: &str = "file_modified";
pub const EVENT_DEBUGGER_DETECTED: &str = "debugger_detected";

/// How serious a [`TamperEvent`] is. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
    /// Triggers the self-destruct as soon as it is recorded.
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the tamper log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TamperEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub details: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
}

impl TamperEvent {
    pub fn new(
        event_type: impl Into<String>,
        details: impl Into<String>,
        severity: Severity,
        file_path: Option<PathBuf>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type: event_type.into(),
            details: details.into(),
            severity,
            file_path,
        }
    }
}
