//! Common data types used throughout the application

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bookable time interval within working hours.
///
/// Generated on demand, never persisted. `end` is always
/// `start + slot duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    /// Half-open interval overlap test: `[self.start, self.end)` intersects
    /// `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }
}

/// A time range already occupied by an existing calendar event.
///
/// Used only for filtering slots, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Incoming request to create a booking.
///
/// `date` is a calendar date (`YYYY-MM-DD`) and `time` a wall-clock time
/// (`HH:MM`) in the configured business timezone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub name: String,
    pub email: String,
    pub date: String,
    pub time: String,
    pub duration_minutes: u32,
}

/// Booking lifecycle state. Transition is one-way: a canceled booking never
/// returns to active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Active,
    Canceled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Canceled => "canceled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }
}

/// Which delivery path produced a booking record. Provenance only; identity
/// is carried by the external keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingSource {
    Direct,
    SyncedWebhook,
    SyncedBackfill,
}

impl BookingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::SyncedWebhook => "synced_webhook",
            Self::SyncedBackfill => "synced_backfill",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "direct" => Some(Self::Direct),
            "synced_webhook" => Some(Self::SyncedWebhook),
            "synced_backfill" => Some(Self::SyncedBackfill),
            _ => None,
        }
    }
}

/// Persisted booking ledger entry.
///
/// `external_invitee_uri`, when present, is the dedup key (unique index in
/// the store). Bookings created directly against the calendar carry no
/// invitee URI and are identified by `external_event_id` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: String,
    pub external_event_id: String,
    pub external_invitee_uri: Option<String>,
    pub attendee_name: String,
    pub attendee_email: String,
    pub event_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub source: BookingSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field set for inserting or updating a booking record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    pub external_event_id: String,
    pub external_invitee_uri: Option<String>,
    pub attendee_name: String,
    pub attendee_email: String,
    pub event_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub source: BookingSource,
}

/// Whether an upsert created a new row or overwrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Result of creating a booking with the calendar provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingHandle {
    pub event_id: String,
    pub link: Option<String>,
}

/// Attendee-status view of an existing booking.
///
/// `response_status` is read verbatim from the provider's first listed
/// attendee; both attendee fields are absent when the provider has no
/// attendee list recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingStatusView {
    pub event_id: String,
    pub summary: Option<String>,
    pub attendee_email: Option<String>,
    pub response_status: Option<String>,
    pub link: Option<String>,
}

/// Outcome of ingesting a single webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    Created,
    Updated,
    Canceled,
    /// Unknown event type, or a cancellation for an invitee that was never
    /// synced. Acknowledged without error.
    Ignored,
}

/// Counters reported by a reconciliation run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub total_events: usize,
}

/// Canonical invitee event after webhook payload normalization.
///
/// Both provider payload shapes collapse into this record before any
/// business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteeEvent {
    pub invitee_name: String,
    pub invitee_email: String,
    pub invitee_uri: String,
    pub event_uri: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub event_name: String,
}

/// Calendar event as seen through the calendar gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub link: Option<String>,
    pub attendees: Vec<EventAttendee>,
}

/// Attendee entry on a calendar event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventAttendee {
    pub email: String,
    pub response_status: Option<String>,
}

/// Event to be created through the calendar gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDraft {
    pub summary: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendee_name: String,
    pub attendee_email: String,
}

/// Identifier pair returned by the calendar provider on event creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub id: String,
    pub link: Option<String>,
}

/// Authentication scope resolved from the scheduling provider. Backfill
/// prefers the organization scope when one is associated with the
/// credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderScope {
    pub user_uri: String,
    pub organization_uri: Option<String>,
}

impl ProviderScope {
    /// The URI backfill listing should be scoped to.
    pub fn effective_uri(&self) -> &str {
        self.organization_uri.as_deref().unwrap_or(&self.user_uri)
    }

    /// True when the effective scope is an organization.
    pub fn is_organization(&self) -> bool {
        self.organization_uri.is_some()
    }
}

/// Scheduled event listed from the provider's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub uri: String,
    pub name: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Invitee lifecycle state on the provider side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteeState {
    Active,
    Canceled,
}

impl From<InviteeState> for BookingStatus {
    fn from(state: InviteeState) -> Self {
        match state {
            InviteeState::Active => BookingStatus::Active,
            InviteeState::Canceled => BookingStatus::Canceled,
        }
    }
}

/// Invitee listed for a scheduled event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitee {
    pub uri: String,
    pub name: String,
    pub email: String,
    pub state: InviteeState,
}

/// One page of scheduled events plus the cursor for the next page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPage {
    pub events: Vec<ScheduledEvent>,
    pub next_page_token: Option<String>,
}

/// One page of invitees plus the cursor for the next page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteePage {
    pub invitees: Vec<Invitee>,
    pub next_page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap()
    }

    #[test]
    fn slot_overlap_is_half_open() {
        let slot = TimeSlot { start: at(9), end: at(10) };

        // Touching boundaries do not overlap
        assert!(!slot.overlaps(at(10), at(11)));
        assert!(!slot.overlaps(at(8), at(9)));

        // Any shared interior point overlaps
        assert!(slot.overlaps(at(9), at(10)));
        assert!(slot.overlaps(at(8), at(23)));
        assert!(slot.overlaps(at(9), at(11)));
    }

    #[test]
    fn status_and_source_roundtrip_through_strings() {
        for status in [BookingStatus::Active, BookingStatus::Canceled] {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        for source in
            [BookingSource::Direct, BookingSource::SyncedWebhook, BookingSource::SyncedBackfill]
        {
            assert_eq!(BookingSource::parse(source.as_str()), Some(source));
        }
        assert_eq!(BookingStatus::parse("unknown"), None);
        assert_eq!(BookingSource::parse("unknown"), None);
    }

    #[test]
    fn scope_prefers_organization() {
        let org = ProviderScope {
            user_uri: "https://api.example.com/users/u1".into(),
            organization_uri: Some("https://api.example.com/organizations/o1".into()),
        };
        assert_eq!(org.effective_uri(), "https://api.example.com/organizations/o1");
        assert!(org.is_organization());

        let user = ProviderScope { user_uri: "https://api.example.com/users/u1".into(), organization_uri: None };
        assert_eq!(user.effective_uri(), "https://api.example.com/users/u1");
        assert!(!user.is_organization());
    }
}
