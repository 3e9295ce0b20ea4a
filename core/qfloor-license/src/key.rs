//! License key parsing.
//!
//! Keys are dash-delimited, human-readable strings:
//!
//! ```text
//! MODEL1-MODEL2-MODEL3[-LICENSE]-TYPE-YEAR[-CUSTOMER]
//! REGIS-7B-C-LICENSE-STANDARD-2027-ABC123
//! ```
//!
//! The first three segments name the model. TYPE is case-insensitive and
//! defaults to trial. YEAR is the last four-digit segment and defaults to
//! [`DEFAULT_EXPIRY_YEAR`]. Nothing in the key is signed.

use crate::error::{LicenseError, LicenseResult};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Expiry year assumed when a key carries none.
pub const DEFAULT_EXPIRY_YEAR: i32 = 2025;

/// Marker segment between model and type in generated keys.
pub const LICENSE_MARKER: &str = "LICENSE";

pub const FEATURE_API: &str = "api";
pub const FEATURE_VOICE: &str = "voice";
pub const FEATURE_BATCH: &str = "batch";
pub const FEATURE_UNLIMITED: &str = "unlimited";

/// Quota value meaning "no limit".
pub const UNLIMITED_REQUESTS: i64 = -1;

/// License tier, which fixes the feature set and request quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseTier {
    #[default]
    Trial,
    Standard,
    Enterprise,
}

impl LicenseTier {
    /// Parses a tier name, ignoring case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "trial" => Some(Self::Trial),
            "standard" => Some(Self::Standard),
            "enterprise" => Some(Self::Enterprise),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Standard => "standard",
            Self::Enterprise => "enterprise",
        }
    }

    /// Features unlocked by this tier.
    #[must_use]
    pub fn features(&self) -> &'static [&'static str] {
        match self {
            Self::Trial => &[FEATURE_API],
            Self::Standard => &[FEATURE_API, FEATURE_VOICE, FEATURE_BATCH],
            Self::Enterprise => &[FEATURE_API, FEATURE_VOICE, FEATURE_BATCH, FEATURE_UNLIMITED],
        }
    }

    /// Request quota, or [`UNLIMITED_REQUESTS`].
    #[must_use]
    pub fn max_requests(&self) -> i64 {
        match self {
            Self::Trial => 1_000,
            Self::Standard => 100_000,
            Self::Enterprise => UNLIMITED_REQUESTS,
        }
    }
}

impl fmt::Display for LicenseTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed license key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseKey {
    raw: String,
    model: String,
    tier: LicenseTier,
    expiry_year: i32,
    customer_hash: Option<String>,
}

impl LicenseKey {
    /// Parses a key string. Only the structure is checked; expiry is not.
    pub fn parse(key: &str) -> LicenseResult<Self> {
        let key = key.trim();
        let parts: Vec<&str> = key.split('-').collect();

        if parts.len() < 3 {
            return Err(LicenseError::MalformedKey(format!(
                "expected at least 3 segments, got {}",
                parts.len()
            )));
        }
        if parts[..3].iter().any(|p| p.is_empty()) {
            return Err(LicenseError::MalformedKey("empty model segment".to_string()));
        }

        let model = parts[..3].join("-");
        let year_idx = parts[3..].iter().rposition(|p| is_year(p)).map(|i| i + 3);
        let expiry_year = year_idx
            .and_then(|i| parts[i].parse().ok())
            .unwrap_or(DEFAULT_EXPIRY_YEAR);

        let tier = type_segment(&parts, year_idx)
            .and_then(LicenseTier::from_name)
            .unwrap_or_default();

        let customer_hash = year_idx
            .and_then(|i| parts.get(i + 1))
            .filter(|p| is_customer_hash(p))
            .map(|p| p.to_string());

        Ok(Self {
            raw: key.to_string(),
            model,
            tier,
            expiry_year,
            customer_hash,
        })
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn tier(&self) -> LicenseTier {
        self.tier
    }

    #[must_use]
    pub fn expiry_year(&self) -> i32 {
        self.expiry_year
    }

    #[must_use]
    pub fn customer_hash(&self) -> Option<&str> {
        self.customer_hash.as_deref()
    }

    /// Last valid instant: 23:59:59 on December 31 of the expiry year.
    #[must_use]
    pub fn expires(&self) -> NaiveDateTime {
        expiry_instant(self.expiry_year)
    }

    /// True when `now` is strictly after [`LicenseKey::expires`].
    #[must_use]
    pub fn is_expired_at(&self, now: NaiveDateTime) -> bool {
        now > self.expires()
    }
}

impl fmt::Display for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn expiry_instant(year: i32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .unwrap_or(NaiveDateTime::MAX)
}

fn is_year(segment: &str) -> bool {
    segment.len() == 4 && segment.bytes().all(|b| b.is_ascii_digit())
}

fn is_customer_hash(segment: &str) -> bool {
    segment.len() == 6 && segment.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// The segment naming the tier: the 4th, or the 5th when the 4th is the
/// `LICENSE` marker. A year in that position means no tier was given.
fn type_segment<'a>(parts: &[&'a str], year_idx: Option<usize>) -> Option<&'a str> {
    let mut idx = 3;
    if parts
        .get(idx)
        .is_some_and(|p| p.eq_ignore_ascii_case(LICENSE_MARKER))
    {
        idx += 1;
    }
    if Some(idx) == year_idx {
        return None;
    }
    parts.get(idx).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_segment_skips_marker() {
        let parts = ["A", "B", "C", "license", "ENTERPRISE", "2030"];
        assert_eq!(type_segment(&parts, Some(5)), Some("ENTERPRISE"));
    }

    #[test]
    fn type_segment_absent_when_year_follows_model() {
        let parts = ["A", "B", "C", "2030"];
        assert_eq!(type_segment(&parts, Some(3)), None);
    }

    #[test]
    fn year_requires_four_digits() {
        assert!(is_year("2025"));
        assert!(!is_year("202"));
        assert!(!is_year("20250"));
        assert!(!is_year("20a5"));
    }

    #[test]
    fn expiry_instant_is_end_of_year() {
        let t = expiry_instant(2025);
        assert_eq!(t.to_string(), "2025-12-31 23:59:59");
    }
}
