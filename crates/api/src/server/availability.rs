//! Availability endpoint.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use slotwise_domain::SlotwiseError;
use tracing::error;

use super::error::{label_of, status_of};
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    date: Option<String>,
}

/// `GET /availability?date=YYYY-MM-DD`
///
/// Degrades to an explicit error payload (with an empty slot list) instead
/// of letting provider failures escape the HTTP boundary.
pub async fn availability_handler(
    State(ctx): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Response {
    let Some(date) = query.date else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "missing 'date' query parameter", "slots": []})),
        )
            .into_response();
    };

    let Some(availability) = ctx.availability.as_ref() else {
        return not_configured();
    };

    match availability.available_slots(&date, Utc::now()).await {
        Ok(slots) => (StatusCode::OK, Json(json!({ "slots": slots }))).into_response(),
        Err(err) => {
            error!(date, error = %err, "availability lookup failed");
            (status_of(&err), Json(json!({"error": label_of(&err), "slots": []})))
                .into_response()
        }
    }
}

fn not_configured() -> Response {
    let err = SlotwiseError::ConfigMissing("calendar is not configured".into());
    (status_of(&err), Json(json!({"error": label_of(&err), "slots": []}))).into_response()
}
