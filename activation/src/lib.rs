//! HTTP API of the Quantum Lock activation service.
//!
//! Every endpoint takes `{"license_key": ..., "machine_id": ...}`:
//!
//! - `POST /activate` returns the activation record, or 403 once the
//!   license is active on the maximum number of machines.
//! - `POST /validate` returns `{"valid": true, ...record}` or
//!   `{"valid": false}`.
//! - `POST /deactivate` returns `{"success": bool}`.

mod store;

pub use store::{ActivationStore, StoreError, StoreResult};

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use qfloor_license::{
    ActivationRecord, ActivationRequest, DEFAULT_ACTIVATION_DAYS, DeactivateResponse,
    ErrorResponse, MAX_ACTIVATIONS_PER_LICENSE, ValidateResponse,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const MISSING_FIELDS: &str = "Missing license_key or machine_id";
pub const LIMIT_REACHED: &str = "Activation limit reached";

/// Shared state of the router.
#[derive(Clone)]
pub struct AppState {
    pub store: ActivationStore,
    pub max_activations: u32,
    pub duration_days: i64,
}

impl AppState {
    pub fn new(store: ActivationStore) -> Self {
        Self {
            store,
            max_activations: MAX_ACTIVATIONS_PER_LICENSE,
            duration_days: DEFAULT_ACTIVATION_DAYS,
        }
    }
}

/// Failure of a request, rendered as `{"error": ...}`.
#[derive(Debug)]
pub enum ApiError {
    MissingFields,
    LimitReached,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingFields => (StatusCode::BAD_REQUEST, MISSING_FIELDS.to_string()),
            Self::LimitReached => (StatusCode::FORBIDDEN, LIMIT_REACHED.to_string()),
            Self::Internal(detail) => {
                error!("activation store failure: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Internal(e.to_string())
    }
}

/// An unparseable or incomplete body is answered like a missing field.
fn complete(
    body: Result<Json<ActivationRequest>, JsonRejection>,
) -> Result<ActivationRequest, ApiError> {
    match body {
        Ok(Json(request)) if request.is_complete() => Ok(request),
        Ok(_) => Err(ApiError::MissingFields),
        Err(rejection) => {
            warn!("rejected request body: {}", rejection);
            Err(ApiError::MissingFields)
        }
    }
}

/// Runs a store call on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

async fn activate_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ActivationRequest>, JsonRejection>,
) -> Result<Json<ActivationRecord>, ApiError> {
    let request = complete(body)?;
    let store = state.store.clone();
    let (days, max) = (state.duration_days, state.max_activations);
    let record = blocking(move || {
        store.activate_within_limit(&request.license_key, &request.machine_id, days, max)
    })
    .await?;

    match record {
        Some(record) => {
            info!("activated machine {}", record.machine_id);
            Ok(Json(record))
        }
        None => Err(ApiError::LimitReached),
    }
}

async fn validate_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ActivationRequest>, JsonRejection>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let request = complete(body)?;
    let store = state.store.clone();
    let record =
        blocking(move || store.validate(&request.license_key, &request.machine_id)).await?;
    Ok(Json(ValidateResponse {
        valid: record.is_some(),
        activation: record,
    }))
}

async fn deactivate_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ActivationRequest>, JsonRejection>,
) -> Result<Json<DeactivateResponse>, ApiError> {
    let ActivationRequest {
        license_key,
        machine_id,
    } = complete(body)?;
    let store = state.store.clone();
    let machine = machine_id.clone();
    let success = blocking(move || store.deactivate(&license_key, &machine)).await?;
    if success {
        info!("deactivated machine {}", machine_id);
    }
    Ok(Json(DeactivateResponse { success }))
}

/// Build the HTTP API router with the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/activate", post(activate_handler))
        .route("/validate", post(validate_handler))
        .route("/deactivate", post(deactivate_handler))
        .with_state(state)
}
