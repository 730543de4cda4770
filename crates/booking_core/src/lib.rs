pub mod allocator;
pub mod calendar;
pub mod clock;
pub mod domain;
pub mod memory;
pub mod ports;
pub mod query;

pub use allocator::SlotAllocator;
pub use calendar::{is_blocked_date, AvailabilityWindow, CalendarRules, Horizon};
pub use clock::{FixedClock, SystemClock};
pub use domain::{
    ClassId, GlassClass, NewReservation, Reservation, ReservationRequest, ReservationStatus,
    TimeSlot,
};
pub use memory::InMemoryStore;
pub use ports::{
    AuthSessionRepository, ClassDirectory, Clock, PortError, PortResult, ReservationRepository,
};
pub use query::ReservationQuery;
