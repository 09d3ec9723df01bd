//! Webhook receiver endpoint.
//!
//! Verifies the delivery signature over the exact raw body before parsing,
//! and acknowledges only after the store write has succeeded, preserving
//! at-least-once-until-persisted semantics.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use slotwise_domain::{IngestOutcome, SlotwiseError};
use tracing::{debug, error, warn};

use super::error::{label_of, status_of, ApiError};
use super::AppState;

/// Header carrying the delivery signature.
const HEADER_SIGNATURE: &str = "calendly-webhook-signature";

/// `POST /webhook`
pub async fn webhook_handler(
    State(ctx): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    // Verify the signature before any parsing or I/O
    if let Some(signing_key) = ctx.config.webhook_signing_key.as_deref() {
        let signature = headers
            .get(HEADER_SIGNATURE)
            .and_then(|value| value.to_str().ok())
            .ok_or(SlotwiseError::SignatureInvalid)?;

        if !slotwise_infra::webhook::verify_signature(&body, signature, signing_key.as_bytes()) {
            warn!("webhook delivery rejected: invalid signature");
            return Err(SlotwiseError::SignatureInvalid.into());
        }
    } else {
        debug!("webhook signature verification skipped (no signing key configured)");
    }

    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| SlotwiseError::InvalidInput(format!("invalid JSON body: {e}")))?;

    let event_type = payload
        .get("event")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| SlotwiseError::InvalidInput("payload missing 'event' type".into()))?
        .to_string();

    // Acknowledge only after the store write succeeds. Internal failures
    // surface as a generic label only; this endpoint is unauthenticated
    // beyond the signature.
    let outcome = match ctx.webhook.handle_event(&event_type, &payload).await {
        Ok(outcome) => outcome,
        Err(err @ SlotwiseError::InvalidInput(_)) => return Err(err.into()),
        Err(err) => {
            error!(error = %err, "webhook ingestion failed");
            return Ok(
                (status_of(&err), Json(json!({ "error": label_of(&err) }))).into_response()
            );
        }
    };

    let mut response = json!({ "ok": true });
    match outcome {
        IngestOutcome::Created => response["created"] = json!(true),
        IngestOutcome::Updated => response["updated"] = json!(true),
        IngestOutcome::Canceled => response["canceled"] = json!(true),
        IngestOutcome::Ignored => response["ignored"] = json!(true),
    }

    Ok((StatusCode::OK, Json(response)).into_response())
}
