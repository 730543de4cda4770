//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use booking_core::ports::{AuthSessionRepository, ClassDirectory, Clock, ReservationRepository};
use booking_core::{AvailabilityWindow, ReservationQuery, SlotAllocator};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub allocator: SlotAllocator,
    pub query: ReservationQuery,
    pub auth: Arc<dyn AuthSessionRepository>,
}

impl AppState {
    /// Wires the booking components to a single storage adapter.
    pub fn new<S>(config: Arc<Config>, store: Arc<S>, clock: Arc<dyn Clock>) -> Self
    where
        S: ReservationRepository + ClassDirectory + AuthSessionRepository + 'static,
    {
        let window = Arc::new(AvailabilityWindow::new(
            clock,
            config.business_offset,
            config.calendar_rules(),
        ));
        let allocator = SlotAllocator::new(window.clone(), store.clone(), store.clone());
        let query = ReservationQuery::new(window, store.clone(), store.clone());

        Self {
            config,
            allocator,
            query,
            auth: store,
        }
    }
}
