//! Webhook ingestion
//!
//! Normalizes provider webhook payloads into one canonical invitee record
//! and applies them to the booking store idempotently. Signature
//! verification over the raw body happens before this layer (see
//! `slotwise_infra::webhook::signature`).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use slotwise_domain::{
    BookingSource, BookingStatus, IngestOutcome, InviteeEvent, NewBooking, Result, SlotwiseError,
    UpsertOutcome,
};
use tracing::{debug, info, warn};

use crate::ports::BookingStore;

/// Event type announcing a newly scheduled invitee.
pub const EVENT_INVITEE_CREATED: &str = "invitee.created";
/// Event type announcing an invitee-side cancellation.
pub const EVENT_INVITEE_CANCELED: &str = "invitee.canceled";

/// Webhook ingestor: idempotent upsert/cancel against the booking store.
pub struct WebhookService {
    store: Arc<dyn BookingStore>,
}

impl WebhookService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Apply one webhook event.
    ///
    /// Duplicate `invitee.created` deliveries overwrite the existing record
    /// (at-least-once delivery), cancellations for unknown invitees are
    /// acknowledged as no-ops, and unrecognized event types are ignored for
    /// forward compatibility.
    pub async fn handle_event(&self, event_type: &str, payload: &Value) -> Result<IngestOutcome> {
        match event_type {
            EVENT_INVITEE_CREATED => {
                let event = normalize_payload(payload)?;
                let outcome = self
                    .store
                    .upsert_by_invitee_uri(booking_from_event(&event, BookingStatus::Active))
                    .await?;
                info!(invitee_uri = %event.invitee_uri, ?outcome, "invitee created");
                Ok(match outcome {
                    UpsertOutcome::Created => IngestOutcome::Created,
                    UpsertOutcome::Updated => IngestOutcome::Updated,
                })
            }
            EVENT_INVITEE_CANCELED => {
                let invitee_uri = invitee_uri_of(payload)?;
                if self.store.cancel_by_invitee_uri(&invitee_uri).await? {
                    info!(%invitee_uri, "invitee canceled");
                    Ok(IngestOutcome::Canceled)
                } else {
                    // Never synced, e.g. created before webhook registration.
                    debug!(%invitee_uri, "cancellation for unknown invitee, ignoring");
                    Ok(IngestOutcome::Ignored)
                }
            }
            other => {
                warn!(event_type = other, "unrecognized webhook event type, acknowledging");
                Ok(IngestOutcome::Ignored)
            }
        }
    }
}

fn booking_from_event(event: &InviteeEvent, status: BookingStatus) -> NewBooking {
    NewBooking {
        external_event_id: event.event_uri.clone(),
        external_invitee_uri: Some(event.invitee_uri.clone()),
        attendee_name: event.invitee_name.clone(),
        attendee_email: event.invitee_email.clone(),
        event_name: event.event_name.clone(),
        start_time: event.start_time,
        end_time: event.end_time,
        status,
        source: BookingSource::SyncedWebhook,
    }
}

/// Normalize the two payload shapes the provider is known to deliver into
/// one canonical record.
///
/// Shape A nests the scheduled event as an object carrying
/// `uri`/`start_time`/`end_time` directly. Shape B carries the event as a
/// bare URI string, with the times as payload siblings or nested under
/// `event_details`. Invitee fields (`uri`, `name`, `email`) sit on the
/// payload itself in both shapes; the whole thing may additionally be
/// wrapped in a top-level `payload` field.
pub fn normalize_payload(raw: &Value) -> Result<InviteeEvent> {
    let body = raw.get("payload").unwrap_or(raw);

    let invitee_uri = required_str(body, "uri")?;
    let invitee_name = optional_str(body, "name").unwrap_or_default();
    let invitee_email = optional_str(body, "email").unwrap_or_default();

    let event_field = body
        .get("scheduled_event")
        .or_else(|| body.get("event"))
        .ok_or_else(|| SlotwiseError::InvalidInput("payload has no event field".into()))?;

    let (event_uri, event_name, start_time, end_time) = match event_field {
        Value::Object(_) => {
            let uri = required_str(event_field, "uri")?;
            let name = optional_str(event_field, "name").unwrap_or_default();
            let start = required_time(event_field, "start_time")?;
            let end = required_time(event_field, "end_time")?;
            (uri, name, start, end)
        }
        Value::String(uri) => {
            // Times live beside the event URI, or one level down.
            let details = body.get("event_details").unwrap_or(body);
            let name = optional_str(body, "event_name")
                .or_else(|| {
                    body.get("event_details").and_then(|details| optional_str(details, "name"))
                })
                .unwrap_or_default();
            let start = required_time(details, "start_time")
                .or_else(|_| required_time(body, "start_time"))?;
            let end =
                required_time(details, "end_time").or_else(|_| required_time(body, "end_time"))?;
            (uri.clone(), name, start, end)
        }
        other => {
            return Err(SlotwiseError::InvalidInput(format!(
                "unsupported event field shape: {other}"
            )))
        }
    };

    Ok(InviteeEvent {
        invitee_name,
        invitee_email,
        invitee_uri,
        event_uri,
        start_time,
        end_time,
        event_name,
    })
}

/// Extract only the invitee URI; cancellations need nothing else.
fn invitee_uri_of(raw: &Value) -> Result<String> {
    let body = raw.get("payload").unwrap_or(raw);
    required_str(body, "uri")
}

fn required_str(value: &Value, field: &str) -> Result<String> {
    optional_str(value, field)
        .ok_or_else(|| SlotwiseError::InvalidInput(format!("payload missing '{field}'")))
}

fn optional_str(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_string)
}

fn required_time(value: &Value, field: &str) -> Result<DateTime<Utc>> {
    let raw = value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| SlotwiseError::InvalidInput(format!("payload missing '{field}'")))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SlotwiseError::InvalidInput(format!("invalid {field} '{raw}': {e}")))
}
