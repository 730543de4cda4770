//! crates/booking_core/src/calendar.rs
//!
//! The availability window: the rolling booking horizon, the calendar rules that
//! block whole days, and the same-day cutoff for time slots.
//!
//! All arithmetic happens in the business time zone (UTC+9 unless configured
//! otherwise), whatever the server's own locale is.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc, Weekday,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::domain::{Reservation, TimeSlot};
use crate::ports::Clock;

/// Offset of the business time zone from UTC, in hours.
pub const BUSINESS_UTC_OFFSET_HOURS: i32 = 9;

/// Minimum lead time before a slot can no longer be booked.
pub const CUTOFF_BUFFER_MINUTES: i64 = 90;

/// Number of bookings that fills a day.
pub const SLOTS_PER_DAY: usize = TimeSlot::ALL.len();

/// Builds the fixed offset for a whole number of hours east of UTC.
pub fn business_offset(hours: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(hours.checked_mul(3600)?)
}

pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Length of the given month in days.
pub fn days_in_month(year: i32, month: u32) -> i64 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

//=========================================================================================
// Horizon
//=========================================================================================

/// The forward-looking range within which bookings are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl Horizon {
    /// The horizon runs from `now` for as many days as the current month has,
    /// so its length varies between 28 and 31 days over the year.
    pub fn starting_at(now: DateTime<FixedOffset>) -> Self {
        let days = days_in_month(now.year(), now.month());
        Self {
            start: now,
            end: now + Duration::days(days),
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date_naive()
    }

    /// Both ends are inclusive.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date() <= date && date <= self.end_date()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end_date();
        self.start_date().iter_days().take_while(move |d| *d <= end)
    }
}

//=========================================================================================
// Calendar Rules
//=========================================================================================

/// Which days are closed for bookings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarRules {
    blocked_weekdays: Vec<Weekday>,
    holidays: BTreeSet<NaiveDate>,
}

impl Default for CalendarRules {
    fn default() -> Self {
        Self {
            blocked_weekdays: vec![Weekday::Mon],
            holidays: BTreeSet::new(),
        }
    }
}

impl CalendarRules {
    /// The default weekly closure plus the given one-off closing days.
    pub fn with_holidays(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn blocked_weekdays(&self) -> &[Weekday] {
        &self.blocked_weekdays
    }

    pub fn holidays(&self) -> &BTreeSet<NaiveDate> {
        &self.holidays
    }
}

pub fn is_blocked_date(date: NaiveDate, rules: &CalendarRules) -> bool {
    rules.blocked_weekdays.contains(&date.weekday()) || rules.holidays.contains(&date)
}

/// Dates on which the given reservations already occupy every slot.
pub fn fully_booked_dates(reservations: &[Reservation]) -> BTreeSet<NaiveDate> {
    let mut per_date: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for reservation in reservations {
        *per_date.entry(reservation.date).or_default() += 1;
    }
    per_date
        .into_iter()
        .filter(|(_, count)| *count >= SLOTS_PER_DAY)
        .map(|(date, _)| date)
        .collect()
}

//=========================================================================================
// AvailabilityWindow
//=========================================================================================

#[derive(Clone)]
pub struct AvailabilityWindow {
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    rules: CalendarRules,
}

impl AvailabilityWindow {
    pub fn new(clock: Arc<dyn Clock>, offset: FixedOffset, rules: CalendarRules) -> Self {
        Self {
            clock,
            offset,
            rules,
        }
    }

    /// A window in the default business time zone with the default rules.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let offset = business_offset(BUSINESS_UTC_OFFSET_HOURS).unwrap_or_else(|| Utc.fix());
        Self::new(clock, offset, CalendarRules::default())
    }

    /// The current moment in the business time zone.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now().with_timezone(&self.offset)
    }

    pub fn horizon(&self) -> Horizon {
        Horizon::starting_at(self.now())
    }

    pub fn excluded_weekdays(&self) -> &[Weekday] {
        self.rules.blocked_weekdays()
    }

    pub fn rules(&self) -> &CalendarRules {
        &self.rules
    }

    /// Dates in the horizon that cannot be booked. A date is disabled when the
    /// calendar rules close it, or when `reservations` fill every slot on it.
    ///
    /// The caller picks the scope of `reservations` (one class, or all of them).
    pub fn disabled_dates(&self, reservations: &[Reservation], horizon: &Horizon) -> Vec<NaiveDate> {
        let mut disabled: BTreeSet<NaiveDate> = fully_booked_dates(reservations)
            .into_iter()
            .filter(|date| horizon.contains(*date))
            .collect();
        disabled.extend(horizon.dates().filter(|d| is_blocked_date(*d, &self.rules)));
        disabled.into_iter().collect()
    }

    /// True when `slot` on `date` starts earlier than `now` plus the cutoff buffer.
    /// Slots on past dates are always past the cutoff.
    pub fn is_past_cutoff(&self, date: NaiveDate, slot: TimeSlot, now: DateTime<FixedOffset>) -> bool {
        let threshold = now.naive_local() + Duration::minutes(CUTOFF_BUFFER_MINUTES);
        NaiveDateTime::new(date, slot.time()) < threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::domain::{NewReservation, TimeSlot};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn kst(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        business_offset(9)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn window_at(now: DateTime<Utc>) -> AvailabilityWindow {
        AvailabilityWindow::with_clock(Arc::new(FixedClock::new(now)))
    }

    fn booking(class_id: i64, on: NaiveDate, slot: TimeSlot) -> Reservation {
        NewReservation {
            class_id,
            user_id: Uuid::new_v4(),
            date: on,
            time_slot: slot,
            created_at: Utc::now(),
        }
        .into_reservation()
    }

    #[test]
    fn leap_years_follow_the_gregorian_rule() {
        assert!(is_leap_year(2024));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(!is_leap_year(2025));
    }

    #[test]
    fn horizon_length_is_the_current_month_length() {
        let cases = [
            (kst(2025, 1, 15, 12, 0), 31),
            (kst(2025, 4, 15, 12, 0), 30),
            (kst(2024, 2, 10, 12, 0), 29),
            (kst(2023, 2, 10, 12, 0), 28),
            (kst(2025, 11, 1, 12, 0), 30),
            (kst(2025, 12, 31, 12, 0), 31),
        ];
        for (now, days) in cases {
            let horizon = window_at(now).horizon();
            assert_eq!(horizon.end - horizon.start, Duration::days(days), "now = {now}");
        }
    }

    #[test]
    fn now_is_anchored_to_the_business_offset() {
        // 20:00 UTC is already the next morning in Seoul.
        let utc = Utc.with_ymd_and_hms(2025, 3, 9, 20, 0, 0).unwrap();
        let window = window_at(utc);
        assert_eq!(window.now().date_naive(), date(2025, 3, 10));
        assert_eq!(window.horizon().start_date(), date(2025, 3, 10));
    }

    #[test]
    fn horizon_contains_both_ends() {
        let horizon = window_at(kst(2025, 3, 5, 9, 0)).horizon();
        assert_eq!(horizon.end_date(), date(2025, 4, 5));
        assert!(horizon.contains(date(2025, 3, 5)));
        assert!(horizon.contains(date(2025, 4, 5)));
        assert!(!horizon.contains(date(2025, 3, 4)));
        assert!(!horizon.contains(date(2025, 4, 6)));
        assert_eq!(horizon.dates().count(), 32);
    }

    #[test]
    fn only_monday_is_excluded_by_default() {
        let window = window_at(kst(2025, 3, 5, 9, 0));
        assert_eq!(window.excluded_weekdays(), &[Weekday::Mon]);
        assert!(is_blocked_date(date(2025, 3, 10), window.rules()));
        assert!(!is_blocked_date(date(2025, 3, 11), window.rules()));
    }

    #[test]
    fn holidays_are_blocked_as_data() {
        let rules = CalendarRules::with_holidays([date(2025, 5, 6)]);
        assert!(is_blocked_date(date(2025, 5, 6), &rules));
        assert!(is_blocked_date(date(2025, 5, 12), &rules));
        assert!(!is_blocked_date(date(2025, 5, 7), &rules));
    }

    #[test]
    fn every_monday_in_the_horizon_is_disabled() {
        let window = window_at(kst(2025, 3, 5, 9, 0));
        let horizon = window.horizon();
        let disabled = window.disabled_dates(&[], &horizon);
        assert_eq!(
            disabled,
            vec![date(2025, 3, 10), date(2025, 3, 17), date(2025, 3, 24), date(2025, 3, 31)]
        );
    }

    #[test]
    fn a_full_day_is_disabled_and_a_partial_one_is_not() {
        let window = window_at(kst(2025, 3, 5, 9, 0));
        let horizon = window.horizon();
        let full = date(2025, 3, 12);
        let partial = date(2025, 3, 13);
        let mut reservations: Vec<_> = TimeSlot::ALL.iter().map(|s| booking(1, full, *s)).collect();
        reservations.push(booking(1, partial, TimeSlot::Ten));

        let disabled = window.disabled_dates(&reservations, &horizon);
        assert!(disabled.contains(&full));
        assert!(!disabled.contains(&partial));
    }

    #[test]
    fn full_days_outside_the_horizon_are_ignored() {
        let window = window_at(kst(2025, 3, 5, 9, 0));
        let horizon = window.horizon();
        let outside = date(2025, 5, 1);
        let reservations: Vec<_> = TimeSlot::ALL.iter().map(|s| booking(1, outside, *s)).collect();
        assert!(!window.disabled_dates(&reservations, &horizon).contains(&outside));
    }

    #[test]
    fn cutoff_blocks_same_day_slots_within_ninety_minutes() {
        let window = window_at(kst(2025, 3, 11, 10, 45));
        let now = window.now();
        let today = date(2025, 3, 11);
        assert!(window.is_past_cutoff(today, TimeSlot::Ten, now));
        assert!(window.is_past_cutoff(today, TimeSlot::Twelve, now));
        assert!(!window.is_past_cutoff(today, TimeSlot::Fourteen, now));
        assert!(!window.is_past_cutoff(date(2025, 3, 12), TimeSlot::Ten, now));
        assert!(window.is_past_cutoff(date(2025, 3, 10), TimeSlot::Sixteen, now));
    }

    #[test]
    fn a_slot_exactly_at_the_threshold_is_still_open() {
        let window = window_at(kst(2025, 3, 11, 12, 30));
        assert!(!window.is_past_cutoff(date(2025, 3, 11), TimeSlot::Fourteen, window.now()));
    }
}
