//! Booking lifecycle endpoints.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use slotwise_domain::{BookingRequest, SlotwiseError};
use tracing::{error, info};

use super::error::ApiError;
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingBody {
    name: Option<String>,
    email: Option<String>,
    date: Option<String>,
    time: Option<String>,
    duration: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventIdQuery {
    event_id: Option<String>,
}

/// `POST /booking`
pub async fn create_handler(
    State(ctx): State<AppState>,
    Json(body): Json<CreateBookingBody>,
) -> Result<Response, ApiError> {
    let booking = ctx.booking.as_ref().ok_or_else(not_configured)?;

    let request = BookingRequest {
        name: required(body.name, "name")?,
        email: required(body.email, "email")?,
        date: required(body.date, "date")?,
        time: required(body.time, "time")?,
        duration_minutes: body
            .duration
            .ok_or_else(|| SlotwiseError::InvalidInput("missing field 'duration'".into()))?,
    };

    let handle = booking.create_booking(&request).await?;
    info!(event_id = %handle.event_id, "booking created");

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "event": { "eventId": handle.event_id, "link": handle.link },
        })),
    )
        .into_response())
}

/// `DELETE /booking?eventId=`
///
/// A booking the provider no longer knows about counts as already canceled;
/// the engine still reports `BookingNotFound` internally, the HTTP surface
/// turns that specific case into a no-op success.
pub async fn delete_handler(
    State(ctx): State<AppState>,
    Query(query): Query<EventIdQuery>,
) -> Result<Response, ApiError> {
    let booking = ctx.booking.as_ref().ok_or_else(not_configured)?;
    let event_id = required(query.event_id, "eventId")?;

    match booking.delete_booking(&event_id).await {
        Ok(()) => {}
        Err(SlotwiseError::BookingNotFound(_)) => {
            info!(event_id, "delete for unknown event, treating as already canceled");
        }
        Err(err) => {
            error!(event_id, error = %err, "booking deletion failed");
            return Err(err.into());
        }
    }

    Ok((StatusCode::OK, Json(json!({ "success": true }))).into_response())
}

/// `GET /booking/status?eventId=`
pub async fn status_handler(
    State(ctx): State<AppState>,
    Query(query): Query<EventIdQuery>,
) -> Result<Response, ApiError> {
    let booking = ctx.booking.as_ref().ok_or_else(not_configured)?;
    let event_id = required(query.event_id, "eventId")?;

    let status = booking.booking_status(&event_id).await?;

    let mut body = json!({
        "success": true,
        "eventId": status.event_id,
        "summary": status.summary,
        "link": status.link,
    });
    if let Some(email) = status.attendee_email {
        body["attendeeEmail"] = json!(email);
    }
    if let Some(response_status) = status.response_status {
        body["responseStatus"] = json!(response_status);
    }

    Ok((StatusCode::OK, Json(body)).into_response())
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(SlotwiseError::InvalidInput(format!("missing field '{field}'")).into()),
    }
}

fn not_configured() -> ApiError {
    SlotwiseError::ConfigMissing("calendar is not configured".into()).into()
}
