//! Availability computation
//!
//! Generates bookable slots for a single day: the working-hours grid minus
//! busy intervals minus slots already elapsed today. The computation is pure
//! and side-effect-free; it may run with unbounded parallelism.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use slotwise_domain::{BookingConfig, BusyInterval, Result, SlotwiseError, TimeSlot};
use tracing::debug;

use crate::ports::CalendarGateway;

/// Generate the bookable slots for `date`.
///
/// One slot per `slot_minutes` step from `work_start` to `work_end`
/// (exclusive), anchored in `tz` so DST and locale offsets are handled once
/// at generation time. Local times erased by a DST gap are skipped;
/// ambiguous local times resolve to the earlier instant. Slot ends are
/// `start + slot_minutes` in absolute time.
///
/// A slot is excluded iff it overlaps any busy interval (half-open rule),
/// or, when `date` is the current day in `tz`, its end is not after `now`.
///
/// Returns a lazy, finite sequence; an empty result means fully booked.
pub fn compute_availability(
    date: NaiveDate,
    work_start: NaiveTime,
    work_end: NaiveTime,
    slot_minutes: u32,
    tz: Tz,
    busy: Vec<BusyInterval>,
    now: DateTime<Utc>,
) -> impl Iterator<Item = TimeSlot> {
    let step = i64::from(slot_minutes);
    let workday_minutes = (work_end - work_start).num_minutes();
    let steps = if step <= 0 || workday_minutes <= 0 { 0 } else { workday_minutes / step };
    let is_today = date == now.with_timezone(&tz).date_naive();

    (0..steps).filter_map(move |index| {
        let start_local = date.and_time(work_start) + Duration::minutes(index * step);
        let start = tz.from_local_datetime(&start_local).earliest()?.with_timezone(&Utc);
        let slot = TimeSlot { start, end: start + Duration::minutes(step) };
        if is_today && slot.end <= now {
            return None;
        }
        if busy.iter().any(|b| slot.overlaps(b.start, b.end)) {
            return None;
        }
        Some(slot)
    })
}

/// Wall-clock label (`HH:MM`) of a slot's start in the business timezone.
pub fn slot_label(slot: &TimeSlot, tz: Tz) -> String {
    slot.start.with_timezone(&tz).format("%H:%M").to_string()
}

/// Availability lookup against the configured calendar.
pub struct AvailabilityService {
    gateway: Arc<dyn CalendarGateway>,
    config: BookingConfig,
}

impl AvailabilityService {
    pub fn new(gateway: Arc<dyn CalendarGateway>, config: BookingConfig) -> Self {
        Self { gateway, config }
    }

    /// Compute slot labels for `date` (`YYYY-MM-DD`), ascending.
    ///
    /// Fetches the day's events from the calendar gateway and filters the
    /// working-hours grid against them.
    pub async fn available_slots(&self, date: &str, now: DateTime<Utc>) -> Result<Vec<String>> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
            SlotwiseError::InvalidInput(format!("invalid date '{date}', expected YYYY-MM-DD"))
        })?;
        let tz = business_timezone(&self.config)?;

        let (day_start, day_end) = day_window(date, tz)?;
        let events = self.gateway.list_events(day_start, day_end).await?;
        let busy: Vec<BusyInterval> =
            events.into_iter().map(|e| BusyInterval { start: e.start, end: e.end }).collect();

        debug!(%date, busy_intervals = busy.len(), "computing availability");

        Ok(compute_availability(
            date,
            self.config.work_start,
            self.config.work_end,
            self.config.slot_minutes,
            tz,
            busy,
            now,
        )
        .map(|slot| slot_label(&slot, tz))
        .collect())
    }
}

/// Parse the configured business timezone.
pub fn business_timezone(config: &BookingConfig) -> Result<Tz> {
    config.timezone.parse().map_err(|_| {
        SlotwiseError::ConfigMissing(format!(
            "unrecognized business timezone '{}'",
            config.timezone
        ))
    })
}

/// UTC instants covering the local calendar day `[date 00:00, date+1 00:00)`.
fn day_window(date: NaiveDate, tz: Tz) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let next = date
        .succ_opt()
        .ok_or_else(|| SlotwiseError::InvalidInput(format!("date '{date}' out of range")))?;
    let start = local_midnight(date, tz)?;
    let end = local_midnight(next, tz)?;
    Ok((start, end))
}

fn local_midnight(date: NaiveDate, tz: Tz) -> Result<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            SlotwiseError::InvalidInput(format!("date '{date}' has no midnight in {tz}"))
        })
}
