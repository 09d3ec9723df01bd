//! Application context - dependency injection container
//!
//! Constructs every adapter once at startup and hands them to the services
//! explicitly, so tests can substitute fakes without touching process
//! environment. Absent credential sections leave the corresponding services
//! unset; their endpoints answer with `ConfigMissing` (503).

use std::sync::Arc;
use std::time::Duration;

use slotwise_core::ports::{BookingStore, CalendarGateway, SchedulingProvider};
use slotwise_core::{AvailabilityService, BackfillService, BookingService, WebhookService};
use slotwise_domain::{AppConfig, Result};
use slotwise_infra::{
    DbManager, HttpCalendarGateway, HttpClient, HttpSchedulingProvider, SqliteBookingStore,
};
use tracing::{info, warn};

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: AppConfig,
    pub db: Arc<DbManager>,
    pub store: Arc<dyn BookingStore>,
    pub webhook: Arc<WebhookService>,
    /// Present only when the calendar section is configured.
    pub availability: Option<Arc<AvailabilityService>>,
    /// Present only when the calendar section is configured.
    pub booking: Option<Arc<BookingService>>,
    /// Present only when the scheduling-provider section is configured.
    pub backfill: Option<Arc<BackfillService>>,
    /// Present only when the scheduling-provider section is configured.
    pub provider: Option<Arc<dyn SchedulingProvider>>,
}

impl AppContext {
    /// Wire all adapters and services from the loaded configuration.
    pub fn new(config: AppConfig) -> Result<Self> {
        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;
        let store: Arc<dyn BookingStore> = Arc::new(SqliteBookingStore::new(db.pool()));

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.booking.provider_timeout_secs.max(1)))
            .user_agent("slotwise/0.1")
            .build()?;

        let (availability, booking) = match &config.calendar {
            Some(calendar) => {
                let gateway: Arc<dyn CalendarGateway> =
                    Arc::new(HttpCalendarGateway::new(calendar, http.clone()));
                info!(calendar_id = %calendar.calendar_id, "calendar gateway configured");
                (
                    Some(Arc::new(AvailabilityService::new(
                        gateway.clone(),
                        config.booking.clone(),
                    ))),
                    Some(Arc::new(BookingService::new(
                        gateway,
                        store.clone(),
                        config.booking.clone(),
                    ))),
                )
            }
            None => {
                warn!("calendar not configured; availability and booking endpoints disabled");
                (None, None)
            }
        };

        let (provider, backfill) = match &config.scheduling {
            Some(scheduling) => {
                let provider: Arc<dyn SchedulingProvider> =
                    Arc::new(HttpSchedulingProvider::new(scheduling, http));
                info!("scheduling provider configured");
                (
                    Some(provider.clone()),
                    Some(Arc::new(BackfillService::new(provider, store.clone()))),
                )
            }
            None => {
                warn!("scheduling provider not configured; sync endpoints disabled");
                (None, None)
            }
        };

        if config.webhook_signing_key.is_none() {
            // Deliberate opt-out, not a silent bypass
            warn!("webhook signing key not configured; signature verification disabled");
        }

        let webhook = Arc::new(WebhookService::new(store.clone()));

        Ok(Self { config, db, store, webhook, availability, booking, backfill, provider })
    }
}
