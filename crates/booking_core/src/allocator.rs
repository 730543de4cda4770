//! crates/booking_core/src/allocator.rs
//!
//! The slot allocator validates a single booking request against the availability
//! window and commits it through the repository's atomic insert.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::calendar::{AvailabilityWindow, Horizon};
use crate::domain::{NewReservation, Reservation, ReservationRequest, TimeSlot};
use crate::ports::{ClassDirectory, PortError, PortResult, ReservationRepository};

pub const DATE_UNAVAILABLE: &str = "This date is not available for reservation";
pub const TIME_UNAVAILABLE: &str = "This time is not available for reservation";
pub const ALREADY_BOOKED: &str = "You have already made a reservation for this class";

fn required(field: &str) -> PortError {
    PortError::Validation(format!("{} is required", field))
}

fn rejected(message: &str) -> PortError {
    debug!(reason = message, "Reservation request rejected");
    PortError::Validation(message.to_string())
}

/// Parses a `YYYY-MM-DD` date coming from a client.
pub fn parse_date(field: &str, raw: &str) -> PortResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        PortError::Validation(format!("{} must be formatted as YYYY-MM-DD", field))
    })
}

#[derive(Clone)]
pub struct SlotAllocator {
    window: Arc<AvailabilityWindow>,
    reservations: Arc<dyn ReservationRepository>,
    classes: Arc<dyn ClassDirectory>,
}

impl SlotAllocator {
    pub fn new(
        window: Arc<AvailabilityWindow>,
        reservations: Arc<dyn ReservationRepository>,
        classes: Arc<dyn ClassDirectory>,
    ) -> Self {
        Self {
            window,
            reservations,
            classes,
        }
    }

    /// Validates and books one slot for `user_id`.
    ///
    /// Rule violations come back as `Validation`, an unknown class as `NotFound`,
    /// and a taken slot or a second booking for the same class and day as `Conflict`.
    pub async fn create_reservation(
        &self,
        user_id: Uuid,
        request: ReservationRequest,
    ) -> PortResult<Reservation> {
        let ReservationRequest {
            class_id,
            reservation_date,
            reservation_time,
        } = request;

        // 1. Required fields
        let class_id = class_id.ok_or_else(|| required("class_id"))?;
        let raw_date = reservation_date
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| required("reservation_date"))?;
        let raw_time = reservation_time
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| required("reservation_time"))?;
        let date = parse_date("reservation_date", &raw_date)?;

        // 2. Date must be inside the horizon and not disabled, judged over every class
        let now = self.window.now();
        let horizon = Horizon::starting_at(now);
        if !horizon.contains(date) {
            return Err(rejected(DATE_UNAVAILABLE));
        }
        let booked = self
            .reservations
            .find_in_range(horizon.start_date(), horizon.end_date(), None)
            .await?;
        if self.window.disabled_dates(&booked, &horizon).contains(&date) {
            return Err(rejected(DATE_UNAVAILABLE));
        }

        // 3. Slot must be one of the fixed four and clear of the cutoff
        let time_slot: TimeSlot = raw_time.trim().parse().map_err(|_| rejected(TIME_UNAVAILABLE))?;
        if self.window.is_past_cutoff(date, time_slot, now) {
            return Err(rejected(TIME_UNAVAILABLE));
        }
        // Slots are exclusive date-wide. The repository re-checks under its lock.
        let slot_taken = self
            .reservations
            .find_by_date(date)
            .await?
            .iter()
            .any(|r| r.time_slot == time_slot);
        if slot_taken {
            debug!(reason = TIME_UNAVAILABLE, "Reservation request rejected");
            return Err(PortError::Conflict(TIME_UNAVAILABLE.to_string()));
        }

        // 4. Class must exist
        self.classes.find_class(class_id).await?;

        // 5. Exclusivity checks and the insert happen atomically in the repository
        let created = self
            .reservations
            .insert_exclusive(NewReservation {
                class_id,
                user_id,
                date,
                time_slot,
                created_at: now.with_timezone(&Utc),
            })
            .await
            .map_err(|e| {
                if let PortError::Conflict(reason) = &e {
                    warn!(class_id, %date, %time_slot, %user_id, %reason, "Reservation conflict");
                }
                e
            })?;

        info!(
            reservation_id = %created.id,
            class_id,
            %date,
            %time_slot,
            "Reservation created"
        );
        Ok(created)
    }
}
