//! Sqlite-backed implementation of the BookingStore port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, OptionalExtension, Row};
use slotwise_core::ports::BookingStore;
use slotwise_domain::{
    BookingRecord, BookingSource, BookingStatus, NewBooking, Result, SlotwiseError, UpsertOutcome,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::manager::SqlitePool;
use crate::errors::InfraError;

/// Sqlite implementation of the booking ledger.
///
/// All write paths go through single-statement upserts against the unique
/// indexes, so concurrent webhook delivery and an in-flight backfill run
/// cannot produce two records for the same invitee. A record that is already
/// `canceled` keeps that status: the transition is one-way.
pub struct SqliteBookingStore {
    pool: Arc<SqlitePool>,
}

impl SqliteBookingStore {
    /// Create a new booking store on the shared pool.
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn connection(&self) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>> {
        self.pool.get().map_err(|e| InfraError::from(e).into())
    }
}

#[async_trait]
impl BookingStore for SqliteBookingStore {
    #[instrument(skip(self, booking), fields(invitee_uri))]
    async fn upsert_by_invitee_uri(&self, booking: NewBooking) -> Result<UpsertOutcome> {
        let invitee_uri = booking.external_invitee_uri.clone().ok_or_else(|| {
            SlotwiseError::InvalidInput("upsert_by_invitee_uri requires an invitee URI".into())
        })?;

        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        // Single-statement upsert against the invitee-URI unique index; the
        // returned revision distinguishes insert (1) from overwrite (>1).
        let revision: i64 = conn
            .query_row(
                "INSERT INTO bookings (
                    id, external_event_id, external_invitee_uri, attendee_name,
                    attendee_email, event_name, start_ts, end_ts, status, source,
                    revision, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, ?11, ?11)
                ON CONFLICT(external_invitee_uri) WHERE external_invitee_uri IS NOT NULL
                DO UPDATE SET
                    external_event_id = excluded.external_event_id,
                    attendee_name = excluded.attendee_name,
                    attendee_email = excluded.attendee_email,
                    event_name = excluded.event_name,
                    start_ts = excluded.start_ts,
                    end_ts = excluded.end_ts,
                    status = CASE WHEN bookings.status = 'canceled'
                                  THEN bookings.status ELSE excluded.status END,
                    source = excluded.source,
                    revision = bookings.revision + 1,
                    updated_at = excluded.updated_at
                RETURNING revision",
                params![
                    Uuid::now_v7().to_string(),
                    booking.external_event_id,
                    invitee_uri,
                    booking.attendee_name,
                    booking.attendee_email,
                    booking.event_name,
                    booking.start_time.timestamp(),
                    booking.end_time.timestamp(),
                    booking.status.as_str(),
                    booking.source.as_str(),
                    now,
                ],
                |row| row.get(0),
            )
            .map_err(InfraError::from)?;

        debug!(%invitee_uri, revision, "upserted booking record");

        Ok(if revision == 1 { UpsertOutcome::Created } else { UpsertOutcome::Updated })
    }

    #[instrument(skip(self, booking), fields(external_event_id = %booking.external_event_id))]
    async fn record_direct(&self, booking: NewBooking) -> Result<()> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        conn.execute(
            "INSERT INTO bookings (
                id, external_event_id, external_invitee_uri, attendee_name,
                attendee_email, event_name, start_ts, end_ts, status, source,
                revision, created_at, updated_at
            ) VALUES (?1, ?2, NULL, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?10)
            ON CONFLICT(external_event_id) WHERE external_invitee_uri IS NULL
            DO UPDATE SET
                attendee_name = excluded.attendee_name,
                attendee_email = excluded.attendee_email,
                event_name = excluded.event_name,
                start_ts = excluded.start_ts,
                end_ts = excluded.end_ts,
                status = CASE WHEN bookings.status = 'canceled'
                              THEN bookings.status ELSE excluded.status END,
                source = excluded.source,
                revision = bookings.revision + 1,
                updated_at = excluded.updated_at",
            params![
                Uuid::now_v7().to_string(),
                booking.external_event_id,
                booking.attendee_name,
                booking.attendee_email,
                booking.event_name,
                booking.start_time.timestamp(),
                booking.end_time.timestamp(),
                booking.status.as_str(),
                booking.source.as_str(),
                now,
            ],
        )
        .map_err(InfraError::from)?;

        debug!(external_event_id = %booking.external_event_id, "recorded direct booking");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn cancel_by_invitee_uri(&self, invitee_uri: &str) -> Result<bool> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        let changed = conn
            .execute(
                "UPDATE bookings SET status = 'canceled', updated_at = ?1
                 WHERE external_invitee_uri = ?2",
                params![now, invitee_uri],
            )
            .map_err(InfraError::from)?;

        debug!(invitee_uri, changed, "canceled booking by invitee uri");
        Ok(changed > 0)
    }

    #[instrument(skip(self))]
    async fn cancel_by_event_id(&self, event_id: &str) -> Result<bool> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        let changed = conn
            .execute(
                "UPDATE bookings SET status = 'canceled', updated_at = ?1
                 WHERE external_event_id = ?2",
                params![now, event_id],
            )
            .map_err(InfraError::from)?;

        debug!(event_id, changed, "canceled booking by event id");
        Ok(changed > 0)
    }

    #[instrument(skip(self))]
    async fn find_by_invitee_uri(&self, invitee_uri: &str) -> Result<Option<BookingRecord>> {
        let conn = self.connection()?;

        let row = conn
            .query_row(
                "SELECT id, external_event_id, external_invitee_uri, attendee_name,
                        attendee_email, event_name, start_ts, end_ts, status, source,
                        created_at, updated_at
                 FROM bookings
                 WHERE external_invitee_uri = ?1",
                params![invitee_uri],
                raw_record,
            )
            .optional()
            .map_err(InfraError::from)?;

        row.map(RawRecord::into_record).transpose()
    }
}

/// Row image before string/timestamp decoding.
struct RawRecord {
    id: String,
    external_event_id: String,
    external_invitee_uri: Option<String>,
    attendee_name: String,
    attendee_email: String,
    event_name: String,
    start_ts: i64,
    end_ts: i64,
    status: String,
    source: String,
    created_at: i64,
    updated_at: i64,
}

fn raw_record(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        id: row.get(0)?,
        external_event_id: row.get(1)?,
        external_invitee_uri: row.get(2)?,
        attendee_name: row.get(3)?,
        attendee_email: row.get(4)?,
        event_name: row.get(5)?,
        start_ts: row.get(6)?,
        end_ts: row.get(7)?,
        status: row.get(8)?,
        source: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

impl RawRecord {
    fn into_record(self) -> Result<BookingRecord> {
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| SlotwiseError::Database(format!("unknown status '{}'", self.status)))?;
        let source = BookingSource::parse(&self.source)
            .ok_or_else(|| SlotwiseError::Database(format!("unknown source '{}'", self.source)))?;

        Ok(BookingRecord {
            id: self.id,
            external_event_id: self.external_event_id,
            external_invitee_uri: self.external_invitee_uri,
            attendee_name: self.attendee_name,
            attendee_email: self.attendee_email,
            event_name: self.event_name,
            start_time: timestamp(self.start_ts)?,
            end_time: timestamp(self.end_ts)?,
            status,
            source,
            created_at: timestamp(self.created_at)?,
            updated_at: timestamp(self.updated_at)?,
        })
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| SlotwiseError::Database(format!("invalid stored timestamp {secs}")))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::database::DbManager;

    fn setup() -> (SqliteBookingStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let manager = DbManager::new(temp_dir.path().join("test.db"), 4).unwrap();
        manager.run_migrations().unwrap();
        (SqliteBookingStore::new(manager.pool()), temp_dir)
    }

    fn synced(uri: &str, email: &str) -> NewBooking {
        NewBooking {
            external_event_id: "https://api.example.com/scheduled_events/ev-1".into(),
            external_invitee_uri: Some(uri.to_string()),
            attendee_name: "Ada Lovelace".into(),
            attendee_email: email.to_string(),
            event_name: "Consultation".into(),
            start_time: Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap(),
            status: BookingStatus::Active,
            source: BookingSource::SyncedWebhook,
        }
    }

    fn direct(event_id: &str) -> NewBooking {
        NewBooking {
            external_event_id: event_id.to_string(),
            external_invitee_uri: None,
            attendee_name: "Grace Hopper".into(),
            attendee_email: "grace@example.com".into(),
            event_name: "Booking: Grace Hopper".into(),
            start_time: Utc.with_ymd_and_hms(2026, 3, 3, 14, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2026, 3, 3, 15, 0, 0).unwrap(),
            status: BookingStatus::Active,
            source: BookingSource::Direct,
        }
    }

    fn count(store: &SqliteBookingStore) -> i64 {
        store
            .connection()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM bookings", params![], |row| row.get(0))
            .unwrap()
    }

    #[tokio::test]
    async fn upsert_creates_then_overwrites() {
        let (store, _tmp) = setup();
        let uri = "https://api.example.com/invitees/inv-1";

        let first = store.upsert_by_invitee_uri(synced(uri, "ada@example.com")).await.unwrap();
        assert_eq!(first, UpsertOutcome::Created);

        let second = store.upsert_by_invitee_uri(synced(uri, "ada+new@example.com")).await.unwrap();
        assert_eq!(second, UpsertOutcome::Updated);

        assert_eq!(count(&store), 1);
        let record = store.find_by_invitee_uri(uri).await.unwrap().unwrap();
        assert_eq!(record.attendee_email, "ada+new@example.com");
        assert_eq!(record.status, BookingStatus::Active);
    }

    #[tokio::test]
    async fn canceled_record_never_returns_to_active() {
        let (store, _tmp) = setup();
        let uri = "https://api.example.com/invitees/inv-2";

        store.upsert_by_invitee_uri(synced(uri, "ada@example.com")).await.unwrap();
        assert!(store.cancel_by_invitee_uri(uri).await.unwrap());

        // Replayed created event carries Active again
        let outcome = store.upsert_by_invitee_uri(synced(uri, "ada@example.com")).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);

        let record = store.find_by_invitee_uri(uri).await.unwrap().unwrap();
        assert_eq!(record.status, BookingStatus::Canceled);
    }

    #[tokio::test]
    async fn cancel_unknown_invitee_is_a_noop() {
        let (store, _tmp) = setup();
        assert!(!store.cancel_by_invitee_uri("https://nope").await.unwrap());
    }

    #[tokio::test]
    async fn upsert_without_invitee_uri_is_rejected() {
        let (store, _tmp) = setup();
        let err = store.upsert_by_invitee_uri(direct("evt-1")).await.unwrap_err();
        assert!(matches!(err, SlotwiseError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn direct_bookings_upsert_by_event_id() {
        let (store, _tmp) = setup();

        store.record_direct(direct("evt-7")).await.unwrap();
        store.record_direct(direct("evt-7")).await.unwrap();
        assert_eq!(count(&store), 1);

        assert!(store.cancel_by_event_id("evt-7").await.unwrap());
        assert!(!store.cancel_by_event_id("evt-unknown").await.unwrap());
    }

    #[tokio::test]
    async fn direct_and_synced_records_coexist() {
        let (store, _tmp) = setup();

        store.record_direct(direct("evt-8")).await.unwrap();
        store
            .upsert_by_invitee_uri(synced("https://api.example.com/invitees/inv-3", "a@b.example"))
            .await
            .unwrap();

        assert_eq!(count(&store), 2);
    }

    #[tokio::test]
    async fn concurrent_upserts_for_one_invitee_yield_one_record() {
        let (store, _tmp) = setup();
        let store = Arc::new(store);
        let uri = "https://api.example.com/invitees/inv-race";

        let a = {
            let store = store.clone();
            tokio::spawn(async move {
                store.upsert_by_invitee_uri(synced(uri, "a@example.com")).await
            })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move {
                store.upsert_by_invitee_uri(synced(uri, "b@example.com")).await
            })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();
        assert_eq!(count(&store), 1);
    }

    #[tokio::test]
    async fn timestamps_roundtrip_through_storage() {
        let (store, _tmp) = setup();
        let uri = "https://api.example.com/invitees/inv-5";
        let booking = synced(uri, "ada@example.com");

        store.upsert_by_invitee_uri(booking.clone()).await.unwrap();
        let record = store.find_by_invitee_uri(uri).await.unwrap().unwrap();
        assert_eq!(record.start_time, booking.start_time);
        assert_eq!(record.end_time, booking.end_time);
        assert_eq!(record.source, BookingSource::SyncedWebhook);
    }
}
