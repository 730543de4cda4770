//! crates/booking_core/src/memory.rs
//!
//! An in-memory adapter implementing every port of the core. Used by the test suites
//! and for running the service without a database.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::allocator::{ALREADY_BOOKED, TIME_UNAVAILABLE};
use crate::domain::{ClassId, GlassClass, NewReservation, Reservation};
use crate::ports::{
    AuthSessionRepository, ClassDirectory, PortError, PortResult, ReservationRepository,
};

#[derive(Default)]
struct Inner {
    classes: HashMap<ClassId, GlassClass>,
    reservations: Vec<Reservation>,
    auth_sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
}

/// Every table lives behind one mutex, so `insert_exclusive` checks and inserts
/// under a single lock.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The guarded data is plain collections; a panic elsewhere cannot leave it torn.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_class(&self, id: ClassId, title: &str) {
        self.lock().classes.insert(
            id,
            GlassClass {
                id,
                title: title.to_string(),
            },
        );
    }

    /// Stores a reservation as-is, bypassing every booking rule.
    pub fn add_reservation(&self, reservation: Reservation) {
        self.lock().reservations.push(reservation);
    }

    pub fn add_auth_session(&self, session_id: &str, user_id: Uuid, expires_at: DateTime<Utc>) {
        self.lock()
            .auth_sessions
            .insert(session_id.to_string(), (user_id, expires_at));
    }

    pub fn reservation_count(&self) -> usize {
        self.lock().reservations.len()
    }
}

fn sorted(mut reservations: Vec<Reservation>) -> Vec<Reservation> {
    reservations.sort_by_key(|r| (r.date, r.time_slot, r.class_id));
    reservations
}

#[async_trait]
impl ReservationRepository for InMemoryStore {
    async fn find_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        class_id: Option<ClassId>,
    ) -> PortResult<Vec<Reservation>> {
        let inner = self.lock();
        let found = inner
            .reservations
            .iter()
            .filter(|r| start <= r.date && r.date <= end)
            .filter(|r| class_id.map_or(true, |id| r.class_id == id))
            .cloned()
            .collect();
        Ok(sorted(found))
    }

    async fn find_by_date(&self, date: NaiveDate) -> PortResult<Vec<Reservation>> {
        let inner = self.lock();
        let found = inner
            .reservations
            .iter()
            .filter(|r| r.date == date)
            .cloned()
            .collect();
        Ok(sorted(found))
    }

    async fn insert_exclusive(&self, reservation: NewReservation) -> PortResult<Reservation> {
        let mut inner = self.lock();

        let slot_taken = inner
            .reservations
            .iter()
            .any(|r| r.date == reservation.date && r.time_slot == reservation.time_slot);
        if slot_taken {
            return Err(PortError::Conflict(TIME_UNAVAILABLE.to_string()));
        }

        let already_booked = inner.reservations.iter().any(|r| {
            r.class_id == reservation.class_id
                && r.user_id == reservation.user_id
                && r.date == reservation.date
        });
        if already_booked {
            return Err(PortError::Conflict(ALREADY_BOOKED.to_string()));
        }

        let created = reservation.into_reservation();
        inner.reservations.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl ClassDirectory for InMemoryStore {
    async fn find_class(&self, class_id: ClassId) -> PortResult<GlassClass> {
        self.lock()
            .classes
            .get(&class_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Class {} not found", class_id)))
    }
}

#[async_trait]
impl AuthSessionRepository for InMemoryStore {
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        match self.lock().auth_sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeSlot;
    use chrono::Duration;

    fn new_booking(class_id: ClassId, user_id: Uuid, slot: TimeSlot) -> NewReservation {
        NewReservation {
            class_id,
            user_id,
            date: NaiveDate::from_ymd_opt(2025, 3, 11).unwrap(),
            time_slot: slot,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn a_taken_slot_conflicts_for_any_class() {
        let store = InMemoryStore::new();
        store
            .insert_exclusive(new_booking(1, Uuid::new_v4(), TimeSlot::Ten))
            .await
            .unwrap();

        let err = store
            .insert_exclusive(new_booking(2, Uuid::new_v4(), TimeSlot::Ten))
            .await
            .unwrap_err();
        assert_eq!(err, PortError::Conflict(TIME_UNAVAILABLE.to_string()));
    }

    #[tokio::test]
    async fn one_booking_per_user_class_and_day() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        store
            .insert_exclusive(new_booking(1, user, TimeSlot::Ten))
            .await
            .unwrap();

        let err = store
            .insert_exclusive(new_booking(1, user, TimeSlot::Twelve))
            .await
            .unwrap_err();
        assert_eq!(err, PortError::Conflict(ALREADY_BOOKED.to_string()));

        // Another class on the same day is fine.
        store
            .insert_exclusive(new_booking(2, user, TimeSlot::Twelve))
            .await
            .unwrap();
        assert_eq!(store.reservation_count(), 2);
    }

    #[tokio::test]
    async fn expired_sessions_are_rejected() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        store.add_auth_session("live", user, Utc::now() + Duration::days(1));
        store.add_auth_session("stale", user, Utc::now() - Duration::minutes(1));

        assert_eq!(store.validate_auth_session("live").await, Ok(user));
        assert_eq!(
            store.validate_auth_session("stale").await,
            Err(PortError::Unauthorized)
        );
        assert_eq!(
            store.validate_auth_session("missing").await,
            Err(PortError::Unauthorized)
        );
    }

    #[tokio::test]
    async fn unknown_classes_are_not_found() {
        let store = InMemoryStore::new();
        store.add_class(7, "Fused glass dish");
        assert_eq!(store.find_class(7).await.unwrap().title, "Fused glass dish");
        assert!(matches!(store.find_class(8).await, Err(PortError::NotFound(_))));
    }
}
