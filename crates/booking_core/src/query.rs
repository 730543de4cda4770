//! crates/booking_core/src/query.rs
//!
//! Read-only views that back the booking calendar UI.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::allocator::parse_date;
use crate::calendar::AvailabilityWindow;
use crate::domain::{ClassId, Reservation, TimeSlot};
use crate::ports::{ClassDirectory, PortError, PortResult, ReservationRepository};

#[derive(Clone)]
pub struct ReservationQuery {
    window: Arc<AvailabilityWindow>,
    reservations: Arc<dyn ReservationRepository>,
    classes: Arc<dyn ClassDirectory>,
}

impl ReservationQuery {
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

    /// Reservations of one class inside the current horizon, ordered by date then slot.
    pub async fn list_reservations(&self, class_id: Option<ClassId>) -> PortResult<Vec<Reservation>> {
        let class_id =
            class_id.ok_or_else(|| PortError::Validation("class_id is required".to_string()))?;
        self.classes.find_class(class_id).await?;

        let horizon = self.window.horizon();
        self.reservations
            .find_in_range(horizon.start_date(), horizon.end_date(), Some(class_id))
            .await
    }

    /// Closed days plus days on which every slot is booked across all classes.
    pub async fn disabled_dates(&self) -> PortResult<Vec<NaiveDate>> {
        let horizon = self.window.horizon();
        let booked = self
            .reservations
            .find_in_range(horizon.start_date(), horizon.end_date(), None)
            .await?;
        Ok(self.window.disabled_dates(&booked, &horizon))
    }

    /// Closed days plus days on which this class alone fills every slot.
    pub async fn disabled_dates_for_class(&self, class_id: ClassId) -> PortResult<Vec<NaiveDate>> {
        self.classes.find_class(class_id).await?;

        let horizon = self.window.horizon();
        let booked = self
            .reservations
            .find_in_range(horizon.start_date(), horizon.end_date(), Some(class_id))
            .await?;
        Ok(self.window.disabled_dates(&booked, &horizon))
    }

    /// Slots on `selected_date` that are already booked by any class or that start
    /// before the cutoff, in slot order.
    pub async fn disabled_time_slots(&self, selected_date: Option<&str>) -> PortResult<Vec<TimeSlot>> {
        let raw = selected_date
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| PortError::Validation("selected_date is required".to_string()))?;
        let date = parse_date("selected_date", raw)?;

        let now = self.window.now();
        let mut disabled: BTreeSet<TimeSlot> = self
            .reservations
            .find_by_date(date)
            .await?
            .into_iter()
            .map(|r| r.time_slot)
            .collect();
        disabled.extend(
            TimeSlot::ALL
                .into_iter()
                .filter(|slot| self.window.is_past_cutoff(date, *slot, now)),
        );
        Ok(disabled.into_iter().collect())
    }
}
