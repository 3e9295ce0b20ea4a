use pretty_assertions::assert_eq;
use qfloor_activation::{ActivationStore, AppState, LIMIT_REACHED, MISSING_FIELDS, build_router};
use qfloor_license::{
    ActivationClient, ActivationRecord, DeactivateResponse, ErrorResponse, LicenseError,
    ValidateResponse,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

const KEY: &str = "REGIS-7B-C-LICENSE-STANDARD-2030";

/// Spin up the HTTP server on an OS-assigned port, returning the base URL.
async fn spawn_server(store: ActivationStore) -> String {
    let app = build_router(Arc::new(AppState::new(store)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

async fn spawn_test_server() -> String {
    spawn_server(ActivationStore::open_in_memory().unwrap()).await
}

async fn post(base: &str, path: &str, body: serde_json::Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{base}/{path}"))
        .json(&body)
        .send()
        .await
        .unwrap()
}

// ── activate ─────────────────────────────────────────────────────

#[tokio::test]
async fn activate_returns_record() {
    let base = spawn_test_server().await;
    let resp = post(&base, "activate", json!({"license_key": KEY, "machine_id": "m1"})).await;

    assert_eq!(resp.status(), 200);
    let record: ActivationRecord = resp.json().await.unwrap();
    assert_eq!(record.license_key, KEY);
    assert_eq!(record.machine_id, "m1");
    assert!(record.is_active);
    assert_eq!(record.activation_count, 1);
    assert_eq!((record.expires_at - record.activated_at).num_days(), 365);
}

#[tokio::test]
async fn fourth_machine_is_refused() {
    let base = spawn_test_server().await;
    for machine in ["m1", "m2", "m3"] {
        let body = json!({"license_key": KEY, "machine_id": machine});
        let resp = post(&base, "activate", body).await;
        assert_eq!(resp.status(), 200);
    }

    let resp = post(&base, "activate", json!({"license_key": KEY, "machine_id": "m4"})).await;
    assert_eq!(resp.status(), 403);
    let body: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(body.error, LIMIT_REACHED);

    let again = post(&base, "activate", json!({"license_key": KEY, "machine_id": "m2"})).await;
    assert_eq!(again.status(), 200);
}

#[tokio::test]
async fn missing_fields_are_rejected_on_every_endpoint() {
    let base = spawn_test_server().await;
    for path in ["activate", "validate", "deactivate"] {
        let resp = post(&base, path, json!({"license_key": KEY})).await;
        assert_eq!(resp.status(), 400, "{path}");
        let body: ErrorResponse = resp.json().await.unwrap();
        assert_eq!(body.error, MISSING_FIELDS);
    }
}

#[tokio::test]
async fn non_json_body_is_bad_request() {
    let base = spawn_test_server().await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/activate"))
        .body("license_key=abc")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

// ── validate / deactivate ────────────────────────────────────────

#[tokio::test]
async fn validate_lifecycle() {
    let base = spawn_test_server().await;
    let pair = json!({"license_key": KEY, "machine_id": "m1"});

    let before: ValidateResponse = post(&base, "validate", pair.clone())
        .await
        .json()
        .await
        .unwrap();
    assert!(!before.valid);
    assert_eq!(before.activation, None);

    post(&base, "activate", pair.clone()).await;
    let during = post(&base, "validate", pair.clone()).await;
    let raw: serde_json::Value = during.json().await.unwrap();
    assert_eq!(raw["valid"], true);
    assert_eq!(raw["machine_id"], "m1");

    let off: DeactivateResponse = post(&base, "deactivate", pair.clone())
        .await
        .json()
        .await
        .unwrap();
    assert!(off.success);

    let after: ValidateResponse = post(&base, "validate", pair).await.json().await.unwrap();
    assert!(!after.valid);
}

#[tokio::test]
async fn deactivate_unknown_pair_reports_failure() {
    let base = spawn_test_server().await;
    let resp = post(&base, "deactivate", json!({"license_key": KEY, "machine_id": "ghost"})).await;
    assert_eq!(resp.status(), 200);
    let body: DeactivateResponse = resp.json().await.unwrap();
    assert!(!body.success);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let base = spawn_test_server().await;
    let resp = post(&base, "api/v1/nonexistent", json!({})).await;
    assert_eq!(resp.status(), 404);
}

// ── client ───────────────────────────────────────────────────────

#[tokio::test]
async fn client_round_trip() {
    let base = spawn_test_server().await;
    let client = ActivationClient::new(&base);

    let record = client.activate(KEY, "m1").await.unwrap();
    assert_eq!(record.machine_id, "m1");

    let valid = client.validate(KEY, "m1").await.unwrap();
    assert_eq!(valid.map(|r| r.machine_id), Some("m1".to_string()));

    assert!(client.deactivate(KEY, "m1").await.unwrap());
    assert_eq!(client.validate(KEY, "m1").await.unwrap(), None);
}

#[tokio::test]
async fn client_reports_device_limit() {
    let base = spawn_test_server().await;
    let client = ActivationClient::new(&base);
    for machine in ["m1", "m2", "m3"] {
        client.activate(KEY, machine).await.unwrap();
    }
    assert!(matches!(
        client.activate(KEY, "m4").await,
        Err(LicenseError::DeviceLimitExceeded(3))
    ));
}

// ── persistence ──────────────────────────────────────────────────

#[tokio::test]
async fn activations_survive_restart() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("activations.db");

    let base = spawn_server(ActivationStore::open(&db).unwrap()).await;
    post(&base, "activate", json!({"license_key": KEY, "machine_id": "m1"})).await;

    let store = ActivationStore::open(&db).unwrap();
    assert_eq!(store.active_count(KEY).unwrap(), 1);
    assert!(store.validate(KEY, "m1").unwrap().is_some());
}
