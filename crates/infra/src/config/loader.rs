//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If that fails, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `SLOTWISE_HOST` / `SLOTWISE_PORT`: HTTP listener
//! - `SLOTWISE_DB_PATH` / `SLOTWISE_DB_POOL_SIZE`: booking store
//! - `SLOTWISE_TIMEZONE`: business timezone (IANA name)
//! - `SLOTWISE_WORK_START` / `SLOTWISE_WORK_END`: working hours (`HH:MM`)
//! - `SLOTWISE_SLOT_MINUTES`: slot duration
//! - `SLOTWISE_PROVIDER_TIMEOUT_SECS`: booking create/delete timeout
//! - `SLOTWISE_CALENDAR_ID`, `SLOTWISE_CALENDAR_CLIENT_ID`,
//!   `SLOTWISE_CALENDAR_CLIENT_SECRET`, `SLOTWISE_CALENDAR_REFRESH_TOKEN`:
//!   calendar identity and credential (all four or none)
//! - `SLOTWISE_SCHEDULING_TOKEN`: scheduling-provider access token
//! - `SLOTWISE_WEBHOOK_SIGNING_KEY`: webhook signature key (optional)
//! - `SLOTWISE_SETUP_SECRET`: secret guarding `/sync` and `/setup/webhook`
//! - `SLOTWISE_SYNC_CRON`: cron expression for scheduled reconciliation

use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use slotwise_domain::{
    AppConfig, BookingConfig, CalendarConfig, DatabaseConfig, Result, SchedulingConfig,
    ServerConfig, SlotwiseError,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If that fails (a
/// malformed value or a partially configured credential section), falls back
/// to loading from a config file.
///
/// # Errors
/// Returns `SlotwiseError::ConfigMissing` if configuration cannot be loaded
/// from either source.
pub fn load() -> Result<AppConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Every setting has a default; credential sections are present only when
/// fully configured. A partially configured section is an error rather than
/// a silently absent integration.
pub fn load_from_env() -> Result<AppConfig> {
    let server = ServerConfig {
        host: env_or("SLOTWISE_HOST", ServerConfig::default().host),
        port: env_parse("SLOTWISE_PORT", ServerConfig::default().port)?,
    };

    let database = DatabaseConfig {
        path: env_or("SLOTWISE_DB_PATH", DatabaseConfig::default().path),
        pool_size: env_parse("SLOTWISE_DB_POOL_SIZE", DatabaseConfig::default().pool_size)?,
    };

    let defaults = BookingConfig::default();
    let booking = BookingConfig {
        timezone: env_or("SLOTWISE_TIMEZONE", defaults.timezone),
        work_start: env_time("SLOTWISE_WORK_START", defaults.work_start)?,
        work_end: env_time("SLOTWISE_WORK_END", defaults.work_end)?,
        slot_minutes: env_parse("SLOTWISE_SLOT_MINUTES", defaults.slot_minutes)?,
        provider_timeout_secs: env_parse(
            "SLOTWISE_PROVIDER_TIMEOUT_SECS",
            defaults.provider_timeout_secs,
        )?,
    };

    Ok(AppConfig {
        server,
        database,
        booking,
        calendar: calendar_from_env()?,
        scheduling: std::env::var("SLOTWISE_SCHEDULING_TOKEN")
            .ok()
            .map(|access_token| SchedulingConfig { access_token }),
        webhook_signing_key: std::env::var("SLOTWISE_WEBHOOK_SIGNING_KEY").ok(),
        setup_secret: std::env::var("SLOTWISE_SETUP_SECRET").ok(),
        sync_cron: std::env::var("SLOTWISE_SYNC_CRON").ok(),
    })
}

/// The calendar section requires all four variables; any strict subset is a
/// configuration mistake worth failing loudly on.
fn calendar_from_env() -> Result<Option<CalendarConfig>> {
    let vars = [
        "SLOTWISE_CALENDAR_ID",
        "SLOTWISE_CALENDAR_CLIENT_ID",
        "SLOTWISE_CALENDAR_CLIENT_SECRET",
        "SLOTWISE_CALENDAR_REFRESH_TOKEN",
    ];
    let values: Vec<Option<String>> = vars.iter().map(|v| std::env::var(v).ok()).collect();

    let present = values.iter().filter(|v| v.is_some()).count();
    if present == 0 {
        return Ok(None);
    }
    if present < vars.len() {
        let missing: Vec<&str> = vars
            .iter()
            .zip(&values)
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();
        return Err(SlotwiseError::ConfigMissing(format!(
            "incomplete calendar configuration, missing {}",
            missing.join(", ")
        )));
    }

    let mut values = values.into_iter().flatten();
    Ok(Some(CalendarConfig {
        calendar_id: values.next().unwrap_or_default(),
        client_id: values.next().unwrap_or_default(),
        client_secret: values.next().unwrap_or_default(),
        refresh_token: values.next().unwrap_or_default(),
    }))
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
pub fn load_from_file(path: Option<PathBuf>) -> Result<AppConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SlotwiseError::ConfigMissing(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SlotwiseError::ConfigMissing(
                "no config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SlotwiseError::ConfigMissing(format!("failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content; format detected by extension.
fn parse_config(contents: &str, path: &Path) -> Result<AppConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SlotwiseError::ConfigMissing(format!("invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SlotwiseError::ConfigMissing(format!("invalid JSON format: {e}"))),
        _ => Err(SlotwiseError::ConfigMissing(format!("unsupported config format: {extension}"))),
    }
}

/// Probe the working directory and the executable's directory for config
/// files; first existing candidate wins.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("config.json"),
            cwd.join("config.toml"),
            cwd.join("slotwise.json"),
            cwd.join("slotwise.toml"),
        ]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(vec![
                exe_dir.join("config.json"),
                exe_dir.join("config.toml"),
                exe_dir.join("slotwise.json"),
                exe_dir.join("slotwise.toml"),
            ]);
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| SlotwiseError::ConfigMissing(format!("invalid value for {key}: '{raw}'"))),
        Err(_) => Ok(default),
    }
}

fn env_time(key: &str, default: NaiveTime) -> Result<NaiveTime> {
    match std::env::var(key) {
        Ok(raw) => NaiveTime::parse_from_str(&raw, "%H:%M").map_err(|_| {
            SlotwiseError::ConfigMissing(format!("invalid time for {key}: '{raw}', expected HH:MM"))
        }),
        Err(_) => Ok(default),
    }
}
