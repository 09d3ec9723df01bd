//! Cron-driven backfill scheduler.
//!
//! Runs the backfill reconciler on a fixed cron schedule, covering webhook
//! delivery gaps without operator involvement. Join handles are tracked,
//! cancellation is explicit, and every run is wrapped in a timeout.

use std::sync::Arc;
use std::time::Duration;

use slotwise_core::BackfillService;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Configuration for the backfill scheduler.
#[derive(Debug, Clone)]
pub struct BackfillSchedulerConfig {
    /// Cron expression describing the execution schedule.
    pub cron_expression: String,
    /// Timeout applied to a single reconciliation run.
    pub job_timeout: Duration,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
}

impl Default for BackfillSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: "0 0 * * * *".into(), // hourly
            job_timeout: Duration::from_secs(600),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

/// Backfill scheduler with explicit lifecycle management.
pub struct BackfillScheduler {
    scheduler: Option<JobScheduler>,
    config: BackfillSchedulerConfig,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    backfill: Arc<BackfillService>,
}

impl BackfillScheduler {
    /// Create a scheduler for the given cron expression.
    pub fn new(cron_expression: String, backfill: Arc<BackfillService>) -> Self {
        let config = BackfillSchedulerConfig { cron_expression, ..Default::default() };
        Self::with_config(config, backfill)
    }

    /// Create a scheduler with a custom configuration.
    pub fn with_config(config: BackfillSchedulerConfig, backfill: Arc<BackfillService>) -> Self {
        Self {
            scheduler: None,
            config,
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            backfill,
        }
    }

    /// Start the scheduler, spawning the monitoring task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler_instance = self.build_scheduler().await?;
        let start_timeout = self.config.start_timeout;

        tokio::time::timeout(start_timeout, scheduler_instance.start())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: start_timeout.as_secs() })?
            .map_err(|source| SchedulerError::StartFailed(source.to_string()))?;

        self.scheduler = Some(scheduler_instance);

        let cancel = self.cancellation.clone();
        let handle = tokio::spawn(async move {
            cancel.cancelled().await;
            debug!("backfill scheduler monitor cancelled");
        });
        self.monitor_handle = Some(handle);

        info!(cron = %self.config.cron_expression, "backfill scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let mut scheduler = match self.scheduler.take() {
            Some(scheduler) => scheduler,
            None => return Err(SchedulerError::NotRunning),
        };

        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, async move { scheduler.shutdown().await })
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: stop_timeout.as_secs() })?
            .map_err(|source| SchedulerError::StopFailed(source.to_string()))?;

        if let Some(handle) = self.monitor_handle.take() {
            handle.abort();
        }

        info!("backfill scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// Returns true when a scheduler instance is active.
    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    async fn build_scheduler(&self) -> SchedulerResult<JobScheduler> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|source| SchedulerError::CreationFailed(source.to_string()))?;

        let backfill = self.backfill.clone();
        let job_timeout = self.config.job_timeout;

        let job = Job::new_async(self.config.cron_expression.as_str(), move |_id, _lock| {
            let backfill = backfill.clone();
            Box::pin(async move {
                match tokio::time::timeout(job_timeout, backfill.sync()).await {
                    Ok(Ok(report)) => {
                        debug!(
                            created = report.created,
                            updated = report.updated,
                            total_events = report.total_events,
                            "scheduled backfill finished"
                        );
                    }
                    Ok(Err(err)) => {
                        error!(error = %err, "scheduled backfill failed");
                    }
                    Err(_) => {
                        warn!(timeout_secs = job_timeout.as_secs(), "scheduled backfill timed out");
                    }
                }
            })
        })
        .map_err(|source| SchedulerError::JobRegistrationFailed(source.to_string()))?;

        scheduler
            .add(job)
            .await
            .map_err(|source| SchedulerError::JobRegistrationFailed(source.to_string()))?;

        debug!(cron = %self.config.cron_expression, "registered backfill job");
        Ok(scheduler)
    }
}

impl Drop for BackfillScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("BackfillScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use slotwise_core::ports::{BookingStore, SchedulingProvider};
    use slotwise_domain::{
        BookingRecord, EventPage, InviteePage, NewBooking, ProviderScope, Result, UpsertOutcome,
    };

    use super::*;

    struct EmptyProvider;

    #[async_trait]
    impl SchedulingProvider for EmptyProvider {
        async fn current_scope(&self) -> Result<ProviderScope> {
            Ok(ProviderScope {
                user_uri: "https://api.example.com/users/u1".into(),
                organization_uri: None,
            })
        }

        async fn scheduled_events(
            &self,
            _scope: &ProviderScope,
            _page_token: Option<&str>,
        ) -> Result<EventPage> {
            Ok(EventPage { events: Vec::new(), next_page_token: None })
        }

        async fn event_invitees(
            &self,
            _event_uri: &str,
            _page_token: Option<&str>,
        ) -> Result<InviteePage> {
            Ok(InviteePage { invitees: Vec::new(), next_page_token: None })
        }

        async fn register_webhook(
            &self,
            _callback_url: &str,
            _scope: &ProviderScope,
        ) -> Result<String> {
            Ok("https://api.example.com/webhook_subscriptions/wh-1".into())
        }
    }

    struct NoopStore;

    #[async_trait]
    impl BookingStore for NoopStore {
        async fn upsert_by_invitee_uri(&self, _booking: NewBooking) -> Result<UpsertOutcome> {
            Ok(UpsertOutcome::Created)
        }
        async fn record_direct(&self, _booking: NewBooking) -> Result<()> {
            Ok(())
        }
        async fn cancel_by_invitee_uri(&self, _invitee_uri: &str) -> Result<bool> {
            Ok(false)
        }
        async fn cancel_by_event_id(&self, _event_id: &str) -> Result<bool> {
            Ok(false)
        }
        async fn find_by_invitee_uri(&self, _invitee_uri: &str) -> Result<Option<BookingRecord>> {
            Ok(None)
        }
    }

    fn scheduler() -> BackfillScheduler {
        let backfill =
            Arc::new(BackfillService::new(Arc::new(EmptyProvider), Arc::new(NoopStore)));
        BackfillScheduler::new("0 0 * * * *".into(), backfill)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lifecycle_runs_successfully() {
        let mut scheduler = scheduler();
        scheduler.start().await.expect("start succeeds");
        assert!(scheduler.is_running());
        scheduler.stop().await.expect("stop succeeds");
        assert!(!scheduler.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn double_start_is_rejected() {
        let mut scheduler = scheduler();
        scheduler.start().await.expect("first start");
        let err = scheduler.start().await.expect_err("second start fails");
        assert!(matches!(err, SchedulerError::AlreadyRunning));
        scheduler.stop().await.expect("stop succeeds");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_without_start_is_rejected() {
        let mut scheduler = scheduler();
        let err = scheduler.stop().await.expect_err("stop fails");
        assert!(matches!(err, SchedulerError::NotRunning));
    }
}
