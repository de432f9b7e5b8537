use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// Verification timestamps are recorded in this fixed civil zone (WIB),
/// whatever the server's locale.
pub const REPORTING_UTC_OFFSET_HOURS: i64 = 7;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn civil_now(&self) -> NaiveDateTime {
        civil_time(self.now())
    }
}

pub fn civil_time(instant: DateTime<Utc>) -> NaiveDateTime {
    instant.naive_utc() + Duration::hours(REPORTING_UTC_OFFSET_HOURS)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    instant: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant: Mutex::new(instant),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self
            .instant
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = *guard + by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self
            .instant
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn civil_time_is_utc_plus_seven() {
        let instant = Utc.with_ymd_and_hms(2026, 3, 1, 20, 30, 0).unwrap();
        let expected = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(3, 30, 0)
            .unwrap();
        assert_eq!(civil_time(instant), expected);
        assert_eq!(FixedClock::new(instant).civil_now(), expected);
    }
}
