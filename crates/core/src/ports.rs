//! Port interfaces for the scheduling engine
//!
//! These traits define the boundaries between core business logic and
//! infrastructure implementations. Adapters live in `slotwise-infra`; tests
//! substitute in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slotwise_domain::{
    CalendarEvent, CreatedEvent, EventDraft, EventPage, InviteePage, NewBooking, ProviderScope,
    Result, UpsertOutcome,
};

/// Thin client to the remote calendar provider.
///
/// Implementations classify provider errors into the domain taxonomy at this
/// boundary; callers never re-classify.
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    /// List events overlapping `[start, end)` on the configured calendar.
    async fn list_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>>;

    /// Create an event with the draft's requester as sole attendee, asking
    /// the provider to dispatch an email invitation as part of creation.
    ///
    /// Not idempotent: repeating the call creates a second event.
    async fn create_event(&self, draft: &EventDraft) -> Result<CreatedEvent>;

    /// Cancel an event, notifying attendees. A missing event surfaces as
    /// `BookingNotFound`.
    async fn delete_event(&self, event_id: &str) -> Result<()>;

    /// Fetch a single event including its attendee list.
    async fn get_event(&self, event_id: &str) -> Result<CalendarEvent>;
}

/// Client to the scheduling-webhook provider's REST API.
#[async_trait]
pub trait SchedulingProvider: Send + Sync {
    /// Resolve the authentication scope of the configured credential.
    async fn current_scope(&self) -> Result<ProviderScope>;

    /// List scheduled events for a scope, one page at a time. Pass the
    /// returned `next_page_token` back in until it is `None`.
    async fn scheduled_events(
        &self,
        scope: &ProviderScope,
        page_token: Option<&str>,
    ) -> Result<EventPage>;

    /// List invitees for a scheduled event, one page at a time.
    async fn event_invitees(
        &self,
        event_uri: &str,
        page_token: Option<&str>,
    ) -> Result<InviteePage>;

    /// Register a webhook subscription delivering invitee events to
    /// `callback_url`. Returns the subscription URI.
    async fn register_webhook(
        &self,
        callback_url: &str,
        scope: &ProviderScope,
    ) -> Result<String>;
}

/// Persistent booking ledger.
///
/// The store is the only shared resource between the three write paths, so
/// `upsert_by_invitee_uri` must be atomic (single insert-or-update by unique
/// key, not a read-then-write pair).
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Insert or overwrite the record for the booking's invitee URI.
    ///
    /// A record that is already `Canceled` keeps that status regardless of
    /// the incoming one: the status transition is one-way.
    async fn upsert_by_invitee_uri(&self, booking: NewBooking) -> Result<UpsertOutcome>;

    /// Record a booking created directly against the calendar (no invitee
    /// URI); keyed by external event id.
    async fn record_direct(&self, booking: NewBooking) -> Result<()>;

    /// Flip the record for an invitee URI to `Canceled`. Returns `false`
    /// when no such record exists (not an error).
    async fn cancel_by_invitee_uri(&self, invitee_uri: &str) -> Result<bool>;

    /// Flip the record for an external event id to `Canceled`. Returns
    /// `false` when no such record exists.
    async fn cancel_by_event_id(&self, event_id: &str) -> Result<bool>;

    /// Look up a record by invitee URI.
    async fn find_by_invitee_uri(
        &self,
        invitee_uri: &str,
    ) -> Result<Option<slotwise_domain::BookingRecord>>;
}
