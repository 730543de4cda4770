//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the booking core's storage ports. It handles all interactions with the
//! PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use booking_core::allocator::{ALREADY_BOOKED, TIME_UNAVAILABLE};
use booking_core::domain::{ClassId, GlassClass, NewReservation, Reservation, TimeSlot};
use booking_core::ports::{
    AuthSessionRepository, ClassDirectory, PortError, PortResult, ReservationRepository,
};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Namespace for the advisory locks taken while booking; the second key is the day.
const BOOKING_LOCK_NAMESPACE: i32 = 0x6763_6c73;

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";
const USER_DAY_CONSTRAINT: &str = "reservations_one_per_user_class_day";

const RESERVATION_COLUMNS: &str =
    "id, class_id, user_id, reservation_date, reservation_time, status, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the reservation, class and auth-session ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Maps a unique-constraint violation on `reservations` to the matching conflict.
fn unique_conflict(e: &sqlx::Error) -> Option<PortError> {
    let db = e.as_database_error()?;
    if db.code()? != UNIQUE_VIOLATION {
        return None;
    }
    let reason = match db.constraint() {
        Some(USER_DAY_CONSTRAINT) => ALREADY_BOOKED,
        _ => TIME_UNAVAILABLE,
    };
    Some(PortError::Conflict(reason.to_string()))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ReservationRecord {
    id: Uuid,
    class_id: i64,
    user_id: Uuid,
    reservation_date: NaiveDate,
    reservation_time: NaiveTime,
    status: String,
    created_at: DateTime<Utc>,
}
impl ReservationRecord {
    fn to_domain(self) -> PortResult<Reservation> {
        let time_slot = TimeSlot::from_time(self.reservation_time)
            .map_err(|e| PortError::Unexpected(format!("reservation {}: {}", self.id, e)))?;
        let status = self
            .status
            .parse()
            .map_err(|e| PortError::Unexpected(format!("reservation {}: {}", self.id, e)))?;
        Ok(Reservation {
            id: self.id,
            class_id: self.class_id,
            user_id: self.user_id,
            date: self.reservation_date,
            time_slot,
            status,
            created_at: self.created_at,
        })
    }
}

fn to_domain_all(records: Vec<ReservationRecord>) -> PortResult<Vec<Reservation>> {
    records.into_iter().map(ReservationRecord::to_domain).collect()
}

#[derive(FromRow)]
struct ClassRecord {
    id: i64,
    title: String,
}
impl ClassRecord {
    fn to_domain(self) -> GlassClass {
        GlassClass {
            id: self.id,
            title: self.title,
        }
    }
}

//=========================================================================================
// `ReservationRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl ReservationRepository for DbAdapter {
    async fn find_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        class_id: Option<ClassId>,
    ) -> PortResult<Vec<Reservation>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations \
             WHERE reservation_date BETWEEN $1 AND $2 \
               AND ($3::BIGINT IS NULL OR class_id = $3) \
             ORDER BY reservation_date, reservation_time, class_id"
        );
        let records = sqlx::query_as::<_, ReservationRecord>(&sql)
            .bind(start)
            .bind(end)
            .bind(class_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        to_domain_all(records)
    }

    async fn find_by_date(&self, date: NaiveDate) -> PortResult<Vec<Reservation>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations \
             WHERE reservation_date = $1 \
             ORDER BY reservation_time, class_id"
        );
        let records = sqlx::query_as::<_, ReservationRecord>(&sql)
            .bind(date)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        to_domain_all(records)
    }

    async fn insert_exclusive(&self, reservation: NewReservation) -> PortResult<Reservation> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Serialize every booking for the same day; slots are exclusive date-wide.
        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(BOOKING_LOCK_NAMESPACE)
            .bind(reservation.date.num_days_from_ce())
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        let slot_taken: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM reservations \
             WHERE reservation_date = $1 AND reservation_time = $2 LIMIT 1",
        )
        .bind(reservation.date)
        .bind(reservation.time_slot.time())
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?;
        if slot_taken.is_some() {
            return Err(PortError::Conflict(TIME_UNAVAILABLE.to_string()));
        }

        let already_booked: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM reservations \
             WHERE class_id = $1 AND user_id = $2 AND reservation_date = $3 LIMIT 1",
        )
        .bind(reservation.class_id)
        .bind(reservation.user_id)
        .bind(reservation.date)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?;
        if already_booked.is_some() {
            return Err(PortError::Conflict(ALREADY_BOOKED.to_string()));
        }

        let created = reservation.into_reservation();
        let sql = format!(
            "INSERT INTO reservations ({RESERVATION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {RESERVATION_COLUMNS}"
        );
        let record = sqlx::query_as::<_, ReservationRecord>(&sql)
            .bind(created.id)
            .bind(created.class_id)
            .bind(created.user_id)
            .bind(created.date)
            .bind(created.time_slot.time())
            .bind(created.status.as_str())
            .bind(created.created_at)
            .fetch_one(&mut *tx)
            .await
            // The unique constraints back up the checks above.
            .map_err(|e| unique_conflict(&e).unwrap_or_else(|| unexpected(e)))?;

        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }
}

//=========================================================================================
// `ClassDirectory` and `AuthSessionRepository` Trait Implementations
//=========================================================================================

#[async_trait]
impl ClassDirectory for DbAdapter {
    async fn find_class(&self, class_id: ClassId) -> PortResult<GlassClass> {
        let record = sqlx::query_as::<_, ClassRecord>(
            "SELECT id, title FROM glass_classes WHERE id = $1",
        )
        .bind(class_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Class {} not found", class_id)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }
}

#[async_trait]
impl AuthSessionRepository for DbAdapter {
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        row.map(|(user_id,)| user_id).ok_or(PortError::Unauthorized)
    }
}
