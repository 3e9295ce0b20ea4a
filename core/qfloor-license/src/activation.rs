//! Activation records and the wire types of the activation service.
//!
//! The service binds a license key to at most
//! [`MAX_ACTIVATIONS_PER_LICENSE`] machines. With the `online` feature,
//! [`ActivationClient`] talks to it over HTTP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Concurrent machine activations allowed per license key.
pub const MAX_ACTIVATIONS_PER_LICENSE: u32 = 3;

/// Default lifetime of a new activation.
pub const DEFAULT_ACTIVATION_DAYS: i64 = 365;

/// One license key activated on one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationRecord {
    pub license_key: String,
    pub machine_id: String,
    pub activated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub activation_count: u32,
}

impl ActivationRecord {
    /// Active and not past `expires_at` at `now`.
    #[must_use]
    pub fn is_current_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now <= self.expires_at
    }
}

/// Body of `/activate`, `/validate` and `/deactivate`.
///
/// Missing fields deserialize as empty strings so the service can answer
/// with its own 400 message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationRequest {
    #[serde(default)]
    pub license_key: String,
    #[serde(default)]
    pub machine_id: String,
}

impl ActivationRequest {
    pub fn new(license_key: impl Into<String>, machine_id: impl Into<String>) -> Self {
        Self {
            license_key: license_key.into(),
            machine_id: machine_id.into(),
        }
    }

    /// Both fields present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.license_key.is_empty() && !self.machine_id.is_empty()
    }
}

/// `/validate` response: `{"valid": true, ...record}` or `{"valid": false}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(flatten)]
    pub activation: Option<ActivationRecord>,
}

/// `/deactivate` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateResponse {
    pub success: bool,
}

/// Error body returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(feature = "online")]
pub use client::ActivationClient;

#[cfg(feature = "online")]
mod client {
    use super::{
        ActivationRecord, ActivationRequest, DeactivateResponse, ErrorResponse,
        MAX_ACTIVATIONS_PER_LICENSE, ValidateResponse,
    };
    use crate::error::{LicenseError, LicenseResult};
    use reqwest::{Client, Response, StatusCode};
    use serde::de::DeserializeOwned;
    use tracing::{debug, info};

    /// HTTP client for the activation service.
    #[derive(Debug, Clone)]
    pub struct ActivationClient {
        base_url: String,
        http: Client,
    }

    impl ActivationClient {
        /// Creates a client for the service at `base_url`
        /// (e.g. `http://127.0.0.1:8080`).
        pub fn new(base_url: impl Into<String>) -> Self {
            Self::with_client(base_url, Client::new())
        }

        pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
            Self {
                base_url: base_url.into().trim_end_matches('/').to_string(),
                http,
            }
        }

        /// Activates `license_key` on `machine_id`.
        ///
        /// # Errors
        ///
        /// [`LicenseError::DeviceLimitExceeded`] when the license is already
        /// active on the maximum number of machines.
        pub async fn activate(
            &self,
            license_key: &str,
            machine_id: &str,
        ) -> LicenseResult<ActivationRecord> {
            let response = self.post("activate", license_key, machine_id).await?;
            if response.status() == StatusCode::FORBIDDEN {
                return Err(LicenseError::DeviceLimitExceeded(MAX_ACTIVATIONS_PER_LICENSE));
            }
            let record: ActivationRecord = decode(response).await?;
            info!("activated license on machine {}", record.machine_id);
            Ok(record)
        }

        /// Returns the activation if it is active and unexpired.
        pub async fn validate(
            &self,
            license_key: &str,
            machine_id: &str,
        ) -> LicenseResult<Option<ActivationRecord>> {
            let response = self.post("validate", license_key, machine_id).await?;
            let body: ValidateResponse = decode(response).await?;
            Ok(body.activation.filter(|_| body.valid))
        }

        /// Deactivates; true when an activation existed.
        pub async fn deactivate(&self, license_key: &str, machine_id: &str) -> LicenseResult<bool> {
            let response = self.post("deactivate", license_key, machine_id).await?;
            let body: DeactivateResponse = decode(response).await?;
            Ok(body.success)
        }

        async fn post(
            &self,
            path: &str,
            license_key: &str,
            machine_id: &str,
        ) -> LicenseResult<Response> {
            let url = format!("{}/{path}", self.base_url);
            debug!("POST {url}");
            self.http
                .post(&url)
                .json(&ActivationRequest::new(license_key, machine_id))
                .send()
                .await
                .map_err(|e| LicenseError::Network(format!("{path} request failed: {e}")))
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> LicenseResult<T> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|e| e.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(LicenseError::ActivationFailed(message));
        }
        response
            .json()
            .await
            .map_err(|e| LicenseError::ActivationFailed(format!("invalid response: {e}")))
    }
}
