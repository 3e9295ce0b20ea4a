//! Runtime license validation and quota enforcement.

use crate::error::{LicenseError, LicenseResult};
use crate::key::{LicenseKey, LicenseTier};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Environment variable consulted by [`LicenseChecker::check_env_license`]
/// callers that have no configured name.
pub const DEFAULT_LICENSE_ENV: &str = "QUANTUM_FLOOR_LICENSE";

pub const REASON_OK: &str = "OK";
pub const REASON_NO_LICENSE: &str = "No valid license";
pub const REASON_EXPIRED: &str = "License expired";
pub const REASON_QUOTA: &str = "Request limit exceeded";

const EXPIRED_ERROR: &str = "License has expired";

/// Validated view of a license key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseInfo {
    pub is_valid: bool,
    pub license_type: LicenseTier,
    pub model: String,
    pub expires: NaiveDateTime,
    pub features: Vec<String>,
    /// Request quota; -1 means unlimited.
    pub max_requests: i64,
    pub customer_hash: Option<String>,
    pub error: Option<String>,
}

impl LicenseInfo {
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

/// Usage counters for the active license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    pub requests_made: u64,
    /// 0 when no license is loaded, -1 when unlimited.
    pub requests_limit: i64,
    /// -1 when unlimited or no license is loaded.
    pub requests_remaining: i64,
}

/// Checks license keys and counts requests against the quota.
///
/// Holds the last valid [`LicenseInfo`]. Invalid or expired keys never
/// replace it.
#[derive(Debug, Default)]
pub struct LicenseChecker {
    info: Option<LicenseInfo>,
    request_count: u64,
}

impl LicenseChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently active license, if any.
    pub fn info(&self) -> Option<&LicenseInfo> {
        self.info.as_ref()
    }

    /// Validates `key` against the local wall clock.
    pub fn check_license_key(&mut self, key: &str) -> LicenseResult<LicenseInfo> {
        self.check_license_key_at(key, Local::now().naive_local())
    }

    /// Validates `key` as of `now`.
    ///
    /// A malformed key is an error. An expired key is returned with
    /// `is_valid == false`.
    pub fn check_license_key_at(
        &mut self,
        key: &str,
        now: NaiveDateTime,
    ) -> LicenseResult<LicenseInfo> {
        let parsed = LicenseKey::parse(key)?;
        let tier = parsed.tier();

        if parsed.is_expired_at(now) {
            warn!("license for {} expired at {}", parsed.model(), parsed.expires());
            return Ok(LicenseInfo {
                is_valid: false,
                license_type: tier,
                model: parsed.model().to_string(),
                expires: parsed.expires(),
                features: Vec::new(),
                max_requests: 0,
                customer_hash: parsed.customer_hash().map(str::to_string),
                error: Some(EXPIRED_ERROR.to_string()),
            });
        }

        let info = LicenseInfo {
            is_valid: true,
            license_type: tier,
            model: parsed.model().to_string(),
            expires: parsed.expires(),
            features: tier.features().iter().map(|f| f.to_string()).collect(),
            max_requests: tier.max_requests(),
            customer_hash: parsed.customer_hash().map(str::to_string),
            error: None,
        };
        info!("{} license accepted for {}", tier, info.model);
        self.info = Some(info.clone());
        Ok(info)
    }

    /// Reads the key from the first line of a license file.
    pub fn check_license_file(&mut self, path: impl AsRef<Path>) -> LicenseResult<LicenseInfo> {
        let key = read_license_file(path)?;
        self.check_license_key(&key)
    }

    /// Reads the key from environment variable `var`.
    pub fn check_env_license(&mut self, var: &str) -> LicenseResult<LicenseInfo> {
        let key = read_env_license(var)?;
        self.check_license_key(&key)
    }

    /// False until a valid license has been checked.
    pub fn has_feature(&self, feature: &str) -> bool {
        self.info.as_ref().is_some_and(|i| i.has_feature(feature))
    }

    pub fn can_make_request(&self) -> (bool, &'static str) {
        self.can_make_request_at(Local::now().naive_local())
    }

    /// Whether another request is allowed as of `now`, with the reason.
    pub fn can_make_request_at(&self, now: NaiveDateTime) -> (bool, &'static str) {
        match self.gate(now) {
            Ok(()) => (true, REASON_OK),
            Err(LicenseError::Expired(_)) => (false, REASON_EXPIRED),
            Err(LicenseError::QuotaExceeded { .. }) => (false, REASON_QUOTA),
            Err(_) => (false, REASON_NO_LICENSE),
        }
    }

    /// The gate alone: why a request would be refused, without counting it.
    pub fn check_request(&self) -> LicenseResult<()> {
        self.check_request_at(Local::now().naive_local())
    }

    pub fn check_request_at(&self, now: NaiveDateTime) -> LicenseResult<()> {
        self.gate(now)
    }

    /// Counts one request. Does not enforce the quota.
    pub fn record_request(&mut self) {
        self.request_count += 1;
    }

    /// Checks the gate and counts the request in one step.
    pub fn authorize_request(&mut self) -> LicenseResult<()> {
        self.authorize_request_at(Local::now().naive_local())
    }

    pub fn authorize_request_at(&mut self, now: NaiveDateTime) -> LicenseResult<()> {
        self.gate(now)?;
        self.record_request();
        Ok(())
    }

    /// Zeroes the request counter.
    pub fn reset_usage(&mut self) {
        self.request_count = 0;
    }

    pub fn usage(&self) -> UsageStats {
        let limit = self.info.as_ref().map_or(0, |i| i.max_requests);
        let remaining = if limit > 0 {
            limit - i64::try_from(self.request_count).unwrap_or(i64::MAX)
        } else {
            -1
        };
        UsageStats {
            requests_made: self.request_count,
            requests_limit: limit,
            requests_remaining: remaining,
        }
    }

    fn gate(&self, now: NaiveDateTime) -> LicenseResult<()> {
        let info = match &self.info {
            Some(info) if info.is_valid => info,
            _ => return Err(LicenseError::NoLicense),
        };
        if now > info.expires {
            return Err(LicenseError::Expired(info.expires.to_string()));
        }
        if info.max_requests > 0 && self.request_count >= info.max_requests.unsigned_abs() {
            return Err(LicenseError::QuotaExceeded {
                limit: info.max_requests,
            });
        }
        Ok(())
    }
}

/// The trimmed first line of a license file. Later lines are ignored.
pub fn read_license_file(path: impl AsRef<Path>) -> LicenseResult<String> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LicenseError::NotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path)?;
    let key = content.lines().next().map(str::trim).unwrap_or_default();
    if key.is_empty() {
        return Err(LicenseError::EmptyFile(path.to_path_buf()));
    }
    debug!("read license from {:?}", path);
    Ok(key.to_string())
}

/// The trimmed value of environment variable `var`.
pub fn read_env_license(var: &str) -> LicenseResult<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| LicenseError::NotSet(var.to_string()))
}

/// True when `key` parses and has not expired.
pub fn verify_license(key: &str) -> bool {
    LicenseChecker::new()
        .check_license_key(key)
        .is_ok_and(|info| info.is_valid)
}

/// Validates `key` with a throwaway checker.
pub fn license_info(key: &str) -> LicenseResult<LicenseInfo> {
    LicenseChecker::new().check_license_key(key)
}
