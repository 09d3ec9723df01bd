//! HTTP surface tests against a running server instance.
//!
//! Covers configuration gating (503 for absent credential sections),
//! webhook signature enforcement, and the webhook ingestion path down to
//! the sqlite store.

use std::sync::Arc;

use serde_json::{json, Value};
use slotwise_domain::{AppConfig, DatabaseConfig};
use slotwise_infra::webhook::signature::{compute_signature, format_signature_header};
use slotwise_lib::{router, AppContext};
use tempfile::TempDir;

fn base_config(tmp: &TempDir) -> AppConfig {
    AppConfig {
        database: DatabaseConfig {
            path: tmp.path().join("test.db").to_string_lossy().into_owned(),
            pool_size: 2,
        },
        ..serde_json::from_str("{}").unwrap()
    }
}

async fn spawn_app(config: AppConfig) -> String {
    let ctx = Arc::new(AppContext::new(config).expect("context"));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router(ctx)).await.expect("serve");
    });
    format!("http://{addr}")
}

fn invitee_created_body() -> Value {
    json!({
        "event": "invitee.created",
        "payload": {
            "uri": "https://api.example.com/invitees/inv-1",
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "scheduled_event": {
                "uri": "https://api.example.com/scheduled_events/ev-1",
                "name": "Consultation",
                "start_time": "2026-03-02T09:00:00Z",
                "end_time": "2026-03-02T10:00:00Z"
            }
        }
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let tmp = TempDir::new().unwrap();
    let base = spawn_app(base_config(&tmp)).await;

    let response = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn unconfigured_calendar_endpoints_answer_503() {
    let tmp = TempDir::new().unwrap();
    let base = spawn_app(base_config(&tmp)).await;
    let client = reqwest::Client::new();

    let response =
        client.get(format!("{base}/availability?date=2026-03-02")).send().await.unwrap();
    assert_eq!(response.status(), 503);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["slots"], json!([]));

    let response = client
        .post(format!("{base}/booking"))
        .json(&json!({
            "name": "Ada", "email": "ada@example.com",
            "date": "2026-03-02", "time": "10:00", "duration": 60
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
}

#[tokio::test]
async fn availability_without_date_is_400() {
    let tmp = TempDir::new().unwrap();
    let base = spawn_app(base_config(&tmp)).await;

    let response = reqwest::get(format!("{base}/availability")).await.unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn unsigned_webhooks_are_processed_when_no_key_is_configured() {
    let tmp = TempDir::new().unwrap();
    let base = spawn_app(base_config(&tmp)).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/webhook"))
        .json(&invitee_created_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["created"], true);

    // Duplicate delivery updates instead of inserting
    let response = client
        .post(format!("{base}/webhook"))
        .json(&invitee_created_body())
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["updated"], true);
}

#[tokio::test]
async fn signed_webhooks_are_enforced_when_key_is_configured() {
    let tmp = TempDir::new().unwrap();
    let mut config = base_config(&tmp);
    config.webhook_signing_key = Some("wh-key".into());
    let base = spawn_app(config).await;
    let client = reqwest::Client::new();

    let payload = serde_json::to_vec(&invitee_created_body()).unwrap();

    // Missing header
    let response = client
        .post(format!("{base}/webhook"))
        .header("content-type", "application/json")
        .body(payload.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // Wrong signature
    let bad = format_signature_header(1, &compute_signature(&payload, b"other-key"));
    let response = client
        .post(format!("{base}/webhook"))
        .header("content-type", "application/json")
        .header("calendly-webhook-signature", bad)
        .body(payload.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // Correct signature over the exact raw body
    let good = format_signature_header(1, &compute_signature(&payload, b"wh-key"));
    let response = client
        .post(format!("{base}/webhook"))
        .header("content-type", "application/json")
        .header("calendly-webhook-signature", good)
        .body(payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn webhook_rejects_unusable_payloads() {
    let tmp = TempDir::new().unwrap();
    let base = spawn_app(base_config(&tmp)).await;
    let client = reqwest::Client::new();

    // Valid JSON without an event type
    let response = client
        .post(format!("{base}/webhook"))
        .json(&json!({"payload": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Not JSON at all
    let response = client
        .post(format!("{base}/webhook"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn unknown_webhook_event_types_are_acknowledged() {
    let tmp = TempDir::new().unwrap();
    let base = spawn_app(base_config(&tmp)).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/webhook"))
        .json(&json!({"event": "routing_form_submission.created", "payload": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ignored"], true);
}

#[tokio::test]
async fn sync_is_guarded_by_the_setup_secret() {
    let tmp = TempDir::new().unwrap();
    let mut config = base_config(&tmp);
    config.setup_secret = Some("op-secret".into());
    let base = spawn_app(config).await;
    let client = reqwest::Client::new();

    let response = client.post(format!("{base}/sync")).send().await.unwrap();
    assert_eq!(response.status(), 401);

    // Authorized, but the provider is not configured
    let response = client
        .post(format!("{base}/sync"))
        .header("x-setup-secret", "op-secret")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
}

#[tokio::test]
async fn webhook_registration_requires_provider_configuration() {
    let tmp = TempDir::new().unwrap();
    let base = spawn_app(base_config(&tmp)).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/setup/webhook"))
        .json(&json!({"url": "https://slotwise.example.com/webhook"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
}
