//! crates/booking_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the booking core.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the database, the class catalogue and the identity service.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{ClassId, GlassClass, NewReservation, Reservation};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port and core operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// A field is missing or malformed, or a date/slot falls outside the booking rules.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    /// The booking collides with an existing reservation.
    #[error("{0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Reservations whose date lies in `[start, end]`, optionally limited to one class.
    async fn find_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        class_id: Option<ClassId>,
    ) -> PortResult<Vec<Reservation>>;

    /// Reservations of every class on a single date.
    async fn find_by_date(&self, date: NaiveDate) -> PortResult<Vec<Reservation>>;

    /// Commits a booking atomically.
    ///
    /// Implementations must check, in the same transaction or lock scope as the insert,
    /// that the slot is still free on that date (for any class) and that the user has
    /// no booking for the same class on that date. Either collision is a
    /// `PortError::Conflict`.
    async fn insert_exclusive(&self, reservation: NewReservation) -> PortResult<Reservation>;
}

/// Resolves class ids against the external class catalogue.
#[async_trait]
pub trait ClassDirectory: Send + Sync {
    /// Returns `PortError::NotFound` for unknown ids.
    async fn find_class(&self, class_id: ClassId) -> PortResult<GlassClass>;
}

/// Read access to the browser login sessions issued by the identity service.
#[async_trait]
pub trait AuthSessionRepository: Send + Sync {
    /// Returns the owning user of an unexpired session, or `PortError::Unauthorized`.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;
}

/// Source of the current instant. Injected so tests can pin "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
