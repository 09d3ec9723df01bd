//! Backfill and webhook-registration endpoints.
//!
//! Both are operator actions guarded by the setup secret when one is
//! configured. Without a secret they stay reachable but return only generic
//! failure text to unauthenticated callers.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use slotwise_domain::SlotwiseError;
use tracing::{error, info};

use super::error::{label_of, status_of, ApiError};
use super::AppState;

/// Header carrying the operator setup secret.
const HEADER_SETUP_SECRET: &str = "x-setup-secret";

/// `POST /sync`
pub async fn sync_handler(
    State(ctx): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Err(rejection) = check_setup_secret(&ctx, &headers) {
        return Ok(rejection);
    }

    let backfill = ctx.backfill.as_ref().ok_or_else(|| {
        SlotwiseError::ConfigMissing("scheduling provider is not configured".into())
    })?;

    let report = match backfill.sync().await {
        Ok(report) => report,
        Err(err) => {
            error!(error = %err, "backfill sync failed");
            return Ok(provider_failure(&ctx, err));
        }
    };

    Ok((
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "created": report.created,
            "updated": report.updated,
            "totalEvents": report.total_events,
        })),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct RegisterWebhookBody {
    url: Option<String>,
}

/// `POST /setup/webhook`
pub async fn register_webhook_handler(
    State(ctx): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RegisterWebhookBody>,
) -> Result<Response, ApiError> {
    if let Err(rejection) = check_setup_secret(&ctx, &headers) {
        return Ok(rejection);
    }

    let provider = ctx.provider.as_ref().ok_or_else(|| {
        SlotwiseError::ConfigMissing("scheduling provider is not configured".into())
    })?;

    let url = body
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| SlotwiseError::InvalidInput("missing field 'url'".into()))?;

    let registered = async {
        let scope = provider.current_scope().await?;
        provider.register_webhook(&url, &scope).await
    }
    .await;

    match registered {
        Ok(webhook_uri) => {
            info!(%webhook_uri, "webhook subscription registered");
            Ok((StatusCode::OK, Json(json!({ "ok": true, "webhookUri": webhook_uri })))
                .into_response())
        }
        Err(err) => {
            error!(error = %err, "webhook registration failed");
            Ok(provider_failure(&ctx, err))
        }
    }
}

/// Full error detail is reserved for callers who proved knowledge of the
/// setup secret; everyone else gets the generic label.
fn provider_failure(ctx: &AppState, err: SlotwiseError) -> Response {
    if ctx.config.setup_secret.is_some() {
        ApiError(err).into_response()
    } else {
        (status_of(&err), Json(json!({ "error": label_of(&err) }))).into_response()
    }
}

fn check_setup_secret(ctx: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    if let Some(expected) = ctx.config.setup_secret.as_deref() {
        let provided = headers.get(HEADER_SETUP_SECRET).and_then(|value| value.to_str().ok());
        if provided != Some(expected) {
            return Err(
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" })))
                    .into_response(),
            );
        }
    }
    Ok(())
}
