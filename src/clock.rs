//! Civil-time clock.
//!
//! Every "today" and every shift-boundary comparison goes through a [`Clock`],
//! which carries the single civil offset the deployment runs in.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::sync::Mutex;

pub trait Clock: Send + Sync {
    /// Current instant expressed in the civil offset.
    fn now(&self) -> DateTime<FixedOffset>;

    /// The civil offset used for all date/time decisions.
    fn offset(&self) -> FixedOffset {
        *self.now().offset()
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn time_of_day(&self) -> NaiveTime {
        self.now().time()
    }

    /// Re-express an instant in the civil offset.
    fn to_civil(&self, instant: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset())
    }

    /// Interpret a wall-clock reading as civil time. `None` when the
    /// reading cannot be represented as an instant.
    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        let offset = self.offset();
        let utc = naive.checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))?;
        Some(DateTime::from_naive_utc_and_offset(utc, offset))
    }
}

/// System clock pinned to a fixed civil offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

/// A clock that only moves when told to. Used by tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(330 * 60).unwrap()
    }

    #[test]
    fn system_clock_reports_configured_offset() {
        let clock = SystemClock::new(ist());
        assert_eq!(clock.now().offset().local_minus_utc(), 330 * 60);
        assert_eq!(clock.offset(), ist());
    }

    #[test]
    fn today_follows_civil_date_not_utc() {
        // 20:00 UTC is already the next day at +05:30
        let utc = Utc.with_ymd_and_hms(2025, 3, 10, 20, 0, 0).unwrap();
        let clock = ManualClock::new(utc.with_timezone(&ist()));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 3, 11).unwrap());
        assert_eq!(clock.time_of_day().hour(), 1);
    }

    #[test]
    fn localize_keeps_wall_clock() {
        let clock = ManualClock::new(ist().with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap());
        let naive = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(18, 15, 0)
            .unwrap();
        let local = clock.localize(naive).unwrap();
        assert_eq!(local.naive_local(), naive);
        assert_eq!(local.offset(), &ist());
    }

    #[test]
    fn localize_rejects_unrepresentable_readings() {
        let clock = ManualClock::new(ist().with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap());
        assert_eq!(clock.localize(NaiveDateTime::MIN), None);
    }

    #[test]
    fn to_civil_converts_foreign_offsets() {
        let clock = ManualClock::new(ist().with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap());
        let utc_instant = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 10, 8, 0, 0)
            .unwrap();
        let civil = clock.to_civil(utc_instant);
        assert_eq!(civil.hour(), 13);
        assert_eq!(civil.minute(), 30);
    }

    #[test]
    fn manual_clock_advances() {
        let start = ist().with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(Duration::minutes(90));
        assert_eq!(clock.now(), start + Duration::minutes(90));
    }
}
