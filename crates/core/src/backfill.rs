//! Backfill reconciliation
//!
//! Walks the scheduling provider's full event/invitee history and syncs it
//! into the booking store with the same upsert used by webhook ingestion.
//! Webhooks only fire for events created after the subscription was
//! registered; backfill covers everything before, and repairs any delivery
//! gaps since. The run holds no store lock beyond each individual upsert.

use std::sync::Arc;

use slotwise_domain::{
    BookingSource, Invitee, NewBooking, Result, ScheduledEvent, SyncReport, UpsertOutcome,
};
use tracing::{debug, info, instrument, warn};

use crate::ports::{BookingStore, SchedulingProvider};

/// Backfill reconciler over the scheduling provider's paginated history.
pub struct BackfillService {
    provider: Arc<dyn SchedulingProvider>,
    store: Arc<dyn BookingStore>,
}

impl BackfillService {
    pub fn new(provider: Arc<dyn SchedulingProvider>, store: Arc<dyn BookingStore>) -> Self {
        Self { provider, store }
    }

    /// Reconcile the store against the provider's full history.
    ///
    /// Idempotent: a second run with no provider-side changes reports
    /// `created = 0` and every previously created record as updated.
    #[instrument(skip(self))]
    pub async fn sync(&self) -> Result<SyncReport> {
        let scope = self.provider.current_scope().await?;
        info!(
            scope = scope.effective_uri(),
            organization = scope.is_organization(),
            "starting backfill sync"
        );

        let mut report = SyncReport::default();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.provider.scheduled_events(&scope, page_token.as_deref()).await?;
            debug!(events = page.events.len(), "fetched scheduled events page");

            for event in &page.events {
                report.total_events += 1;
                self.sync_event_invitees(event, &mut report).await?;
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        info!(
            created = report.created,
            updated = report.updated,
            total_events = report.total_events,
            "backfill sync completed"
        );
        Ok(report)
    }

    async fn sync_event_invitees(
        &self,
        event: &ScheduledEvent,
        report: &mut SyncReport,
    ) -> Result<()> {
        let mut page_token: Option<String> = None;
        let mut seen = 0usize;

        loop {
            let page = self.provider.event_invitees(&event.uri, page_token.as_deref()).await?;
            seen += page.invitees.len();

            for invitee in &page.invitees {
                match self.store.upsert_by_invitee_uri(booking_of(event, invitee)).await? {
                    UpsertOutcome::Created => report.created += 1,
                    UpsertOutcome::Updated => report.updated += 1,
                }
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        if seen == 0 {
            // At least one invitee is expected per scheduled event.
            warn!(event_uri = %event.uri, "scheduled event has no invitees");
        }
        Ok(())
    }
}

fn booking_of(event: &ScheduledEvent, invitee: &Invitee) -> NewBooking {
    NewBooking {
        external_event_id: event.uri.clone(),
        external_invitee_uri: Some(invitee.uri.clone()),
        attendee_name: invitee.name.clone(),
        attendee_email: invitee.email.clone(),
        event_name: event.name.clone().unwrap_or_default(),
        start_time: event.start_time,
        end_time: event.end_time,
        status: invitee.state.into(),
        source: BookingSource::SyncedBackfill,
    }
}
