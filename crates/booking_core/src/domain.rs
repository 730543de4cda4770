//! crates/booking_core/src/domain.rs
//!
//! Defines the pure, core data structures for the booking service.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a class owned by the external class catalogue.
pub type ClassId = i64;

/// A bookable glass-craft class. The core only cares about its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlassClass {
    pub id: ClassId,
    pub title: String,
}

//=========================================================================================
// Time Slots
//=========================================================================================

/// One of the four fixed times of day a class can be booked into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeSlot {
    Ten,
    Twelve,
    Fourteen,
    Sixteen,
}

/// Returned when a string or time does not name one of the valid slots.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid time slot")]
pub struct InvalidTimeSlot(pub String);

impl TimeSlot {
    /// Every valid slot, in chronological order.
    pub const ALL: [TimeSlot; 4] = [
        TimeSlot::Ten,
        TimeSlot::Twelve,
        TimeSlot::Fourteen,
        TimeSlot::Sixteen,
    ];

    pub fn hour(self) -> u32 {
        match self {
            TimeSlot::Ten => 10,
            TimeSlot::Twelve => 12,
            TimeSlot::Fourteen => 14,
            TimeSlot::Sixteen => 16,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeSlot::Ten => "10:00:00",
            TimeSlot::Twelve => "12:00:00",
            TimeSlot::Fourteen => "14:00:00",
            TimeSlot::Sixteen => "16:00:00",
        }
    }

    /// The slot's time of day in the business time zone.
    pub fn time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour(), 0, 0).unwrap_or(NaiveTime::MIN)
    }

    /// Maps a stored time of day back to its slot.
    pub fn from_time(time: NaiveTime) -> Result<Self, InvalidTimeSlot> {
        Self::ALL
            .into_iter()
            .find(|slot| slot.time() == time)
            .ok_or_else(|| InvalidTimeSlot(time.format("%H:%M:%S").to_string()))
    }
}

impl FromStr for TimeSlot {
    type Err = InvalidTimeSlot;

    /// Accepts only the exact `HH:MM:SS` spelling of a valid slot.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| InvalidTimeSlot(s.to_string()))
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//=========================================================================================
// Reservations
//=========================================================================================

/// Review state of a reservation. New bookings always start as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReservationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ReservationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Approved => "approved",
            ReservationStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReservationStatus::Pending),
            "approved" => Ok(ReservationStatus::Approved),
            "rejected" => Ok(ReservationStatus::Rejected),
            other => Err(format!("unknown reservation status '{}'", other)),
        }
    }
}

/// One booked slot for one class by one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: Uuid,
    pub class_id: ClassId,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

/// A fully validated booking, ready to be committed by a repository.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub class_id: ClassId,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub created_at: DateTime<Utc>,
}

impl NewReservation {
    /// Materializes the record with a fresh id and the initial status.
    pub fn into_reservation(self) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            class_id: self.class_id,
            user_id: self.user_id,
            date: self.date,
            time_slot: self.time_slot,
            status: ReservationStatus::default(),
            created_at: self.created_at,
        }
    }
}

/// The raw booking request as submitted by a client. Every field may be
/// missing; the allocator decides what is acceptable.
#[derive(Debug, Clone, Default)]
pub struct ReservationRequest {
    pub class_id: Option<ClassId>,
    pub reservation_date: Option<String>,
    pub reservation_time: Option<String>,
}
