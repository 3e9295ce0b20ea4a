//! Licensing for Quantum Lock protected models.
//!
//! This module handles:
//! - Parsing dash-delimited license keys into model, tier and expiry
//! - Tier feature sets and request quotas
//! - Per-process usage counting
//! - Machine fingerprints and the activation service wire types
//!
//! # License Key Format
//!
//! `MODEL1-MODEL2-MODEL3[-LICENSE]-TYPE-YEAR[-CUSTOMER]`, for example
//! `REGIS-7B-C-LICENSE-TRIAL-2025`. A key is valid through 23:59:59 on
//! December 31 of its year.
//!
//! Keys are not signed. Anyone who knows the format can mint one; binding a
//! key to machines is the job of the activation service.
//!
//! # Tiers
//!
//! | Tier | Features | Requests |
//! |---|---|---|
//! | trial | api | 1,000 |
//! | standard | api, voice, batch | 100,000 |
//! | enterprise | api, voice, batch, unlimited | unlimited |

mod activation;
mod checker;
mod device;
mod error;
mod key;

pub use activation::{
    ActivationRecord, ActivationRequest, DEFAULT_ACTIVATION_DAYS, DeactivateResponse,
    ErrorResponse, MAX_ACTIVATIONS_PER_LICENSE, ValidateResponse,
};
pub use checker::{
    DEFAULT_LICENSE_ENV, LicenseChecker, LicenseInfo, REASON_EXPIRED, REASON_NO_LICENSE,
    REASON_OK, REASON_QUOTA, UsageStats, license_info, read_env_license, read_license_file,
    verify_license,
};
pub use device::DeviceFingerprint;
pub use error::{LicenseError, LicenseResult};
pub use key::{
    DEFAULT_EXPIRY_YEAR, FEATURE_API, FEATURE_BATCH, FEATURE_UNLIMITED, FEATURE_VOICE,
    LICENSE_MARKER, LicenseKey, LicenseTier, UNLIMITED_REQUESTS,
};

#[cfg(feature = "online")]
pub use activation::ActivationClient;
