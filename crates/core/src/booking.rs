//! Booking lifecycle management
//!
//! Creates, cancels, and inspects single bookings against the calendar
//! gateway. Create and delete are side-effect-bearing, non-idempotent
//! provider calls: they are wrapped in a timeout and never retried here.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use slotwise_domain::{
    BookingConfig, BookingHandle, BookingRequest, BookingSource, BookingStatus, BookingStatusView,
    EventDraft, NewBooking, Result, SlotwiseError,
};
use tracing::{debug, info, warn};

use crate::availability::business_timezone;
use crate::ports::{BookingStore, CalendarGateway};

/// Booking lifecycle manager.
pub struct BookingService {
    gateway: Arc<dyn CalendarGateway>,
    store: Arc<dyn BookingStore>,
    config: BookingConfig,
}

impl BookingService {
    pub fn new(
        gateway: Arc<dyn CalendarGateway>,
        store: Arc<dyn BookingStore>,
        config: BookingConfig,
    ) -> Self {
        Self { gateway, store, config }
    }

    /// Create a booking: one provider event spanning the requested interval
    /// with the requester as sole attendee, invitation email dispatched by
    /// the provider.
    ///
    /// Validation fails fast before any network call. The provider call is
    /// not idempotent and carries no idempotency key; it is never retried
    /// automatically.
    pub async fn create_booking(&self, request: &BookingRequest) -> Result<BookingHandle> {
        let (start, end) = self.parse_interval(request)?;

        let draft = EventDraft {
            summary: format!("Booking: {}", request.name.trim()),
            description: Some(format!(
                "Booked by {} <{}>",
                request.name.trim(),
                request.email.trim()
            )),
            start,
            end,
            attendee_name: request.name.trim().to_string(),
            attendee_email: request.email.trim().to_string(),
        };

        let created = self
            .with_timeout("create booking", self.gateway.create_event(&draft))
            .await?;

        info!(event_id = %created.id, "booking created with provider");

        // The provider event exists at this point; a ledger write failure is
        // logged and repaired by reconciliation rather than failing the
        // request.
        let record = NewBooking {
            external_event_id: created.id.clone(),
            external_invitee_uri: None,
            attendee_name: draft.attendee_name.clone(),
            attendee_email: draft.attendee_email.clone(),
            event_name: draft.summary.clone(),
            start_time: start,
            end_time: end,
            status: BookingStatus::Active,
            source: BookingSource::Direct,
        };
        if let Err(e) = self.store.record_direct(record).await {
            warn!(event_id = %created.id, error = %e, "failed to record direct booking");
        }

        Ok(BookingHandle { event_id: created.id, link: created.link })
    }

    /// Cancel a booking with attendee notification.
    ///
    /// A provider-side "no such event" surfaces as `BookingNotFound`; the
    /// caller decides whether to treat that as already-canceled.
    pub async fn delete_booking(&self, event_id: &str) -> Result<()> {
        let event_id = non_empty(event_id, "eventId")?;

        self.with_timeout("delete booking", self.gateway.delete_event(event_id)).await?;

        if let Err(e) = self.store.cancel_by_event_id(event_id).await {
            warn!(event_id, error = %e, "failed to mark booking canceled in store");
        }

        info!(event_id, "booking canceled");
        Ok(())
    }

    /// Fetch the attendee status of a booking.
    ///
    /// The response status is read verbatim from the provider's first listed
    /// attendee; an event without an attendee list is returned without the
    /// attendee fields rather than failing.
    pub async fn booking_status(&self, event_id: &str) -> Result<BookingStatusView> {
        let event_id = non_empty(event_id, "eventId")?;

        let event = self.gateway.get_event(event_id).await?;
        let first = event.attendees.first();

        Ok(BookingStatusView {
            event_id: event.id,
            summary: event.summary,
            attendee_email: first.map(|a| a.email.clone()),
            response_status: first.and_then(|a| a.response_status.clone()),
            link: event.link,
        })
    }

    /// Resolve the requested date and wall-clock time in the business
    /// timezone into the UTC interval `[start, start + duration)`.
    fn parse_interval(
        &self,
        request: &BookingRequest,
    ) -> Result<(chrono::DateTime<Utc>, chrono::DateTime<Utc>)> {
        if request.name.trim().is_empty() {
            return Err(SlotwiseError::InvalidInput("name must not be empty".into()));
        }
        if request.email.trim().is_empty() || !request.email.contains('@') {
            return Err(SlotwiseError::InvalidInput(format!(
                "invalid email '{}'",
                request.email
            )));
        }
        if request.duration_minutes == 0 {
            return Err(SlotwiseError::InvalidInput("duration must be positive".into()));
        }

        let date = NaiveDate::parse_from_str(request.date.trim(), "%Y-%m-%d").map_err(|_| {
            SlotwiseError::InvalidInput(format!(
                "invalid date '{}', expected YYYY-MM-DD",
                request.date
            ))
        })?;
        let time = NaiveTime::parse_from_str(request.time.trim(), "%H:%M").map_err(|_| {
            SlotwiseError::InvalidInput(format!("invalid time '{}', expected HH:MM", request.time))
        })?;

        let tz = business_timezone(&self.config)?;
        let start = tz
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .ok_or_else(|| {
                SlotwiseError::InvalidInput(format!(
                    "{} {} does not exist in {}",
                    request.date, request.time, self.config.timezone
                ))
            })?
            .with_timezone(&Utc);
        let end = start + Duration::minutes(i64::from(request.duration_minutes));

        debug!(%start, %end, "parsed booking interval");
        Ok((start, end))
    }

    async fn with_timeout<T>(
        &self,
        operation: &str,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        let limit = StdDuration::from_secs(self.config.provider_timeout_secs.max(1));
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(SlotwiseError::Timeout(format!(
                "{operation} did not complete within {}s",
                limit.as_secs()
            ))),
        }
    }
}

fn non_empty<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SlotwiseError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(trimmed)
}
