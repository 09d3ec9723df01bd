//! Configuration structures
//!
//! Presence or absence of the optional credential sections gates endpoint
//! availability: handlers depending on an absent section fail with
//! `ConfigMissing` (surfaced as 503), never with a generic 500.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Top-level application configuration, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    /// Calendar identity and credential. Absent ⇒ availability and booking
    /// endpoints are unconfigured.
    #[serde(default)]
    pub calendar: Option<CalendarConfig>,
    /// Scheduling-provider credential. Absent ⇒ sync and webhook
    /// registration are unconfigured.
    #[serde(default)]
    pub scheduling: Option<SchedulingConfig>,
    /// Webhook signing key. Absent ⇒ signature verification is deliberately
    /// skipped (logged at startup, not a silent bypass).
    #[serde(default)]
    pub webhook_signing_key: Option<String>,
    /// Shared secret guarding `/sync` and `/setup/webhook`. Absent ⇒ those
    /// endpoints are open but return only generic failure text.
    #[serde(default)]
    pub setup_secret: Option<String>,
    /// Cron expression for the in-process backfill scheduler. Absent ⇒ no
    /// scheduled reconciliation; `/sync` remains available.
    #[serde(default)]
    pub sync_cron: Option<String>,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8080 }
    }
}

/// Booking-store database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "slotwise.db".to_string(), pool_size: 4 }
    }
}

/// Working-calendar parameters for availability and booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// IANA timezone the business operates in. Dates and wall-clock times in
    /// requests are interpreted here.
    pub timezone: String,
    pub work_start: NaiveTime,
    pub work_end: NaiveTime,
    pub slot_minutes: u32,
    /// Timeout applied to booking create/delete calls against the provider.
    pub provider_timeout_secs: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Berlin".to_string(),
            work_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            work_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            slot_minutes: 60,
            provider_timeout_secs: 30,
        }
    }
}

/// Calendar identity plus the OAuth refresh credential used to act on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub calendar_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

/// Scheduling-provider API credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_a_working_day() {
        let booking = BookingConfig::default();
        assert!(booking.work_start < booking.work_end);
        assert_eq!(booking.slot_minutes, 60);
    }

    #[test]
    fn optional_sections_default_to_absent() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert!(config.calendar.is_none());
        assert!(config.scheduling.is_none());
        assert!(config.webhook_signing_key.is_none());
        assert!(config.setup_secret.is_none());
        assert_eq!(config.server.port, 8080);
    }
}
