use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Datelike, Local, TimeZone};

use crate::schedule::query::WallTime;
use crate::schedule::time::{ClockTime, Day};

pub trait Clock: Send + Sync {
    fn now(&self) -> Result<WallTime>;
    fn label(&self) -> &'static str;
}

/// Reads the local system clock on every call.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<WallTime> {
        Ok(wall_time_at(&Local::now()))
    }

    fn label(&self) -> &'static str {
        "SYSTEM_LOCAL"
    }
}

/// Always reports the same wall time. Used by `--at` and in tests.
pub struct FixedClock {
    at: WallTime,
}

impl FixedClock {
    pub fn new(at: WallTime) -> Self {
        Self { at }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Result<WallTime> {
        Ok(self.at)
    }

    fn label(&self) -> &'static str {
        "FIXED"
    }
}

pub fn wall_time_at<Tz: TimeZone>(instant: &DateTime<Tz>) -> WallTime {
    let naive = instant.naive_local();
    WallTime::new(
        Day::from_weekday(naive.weekday()),
        ClockTime::from_naive(naive.time()),
    )
}

pub struct SelectedClock {
    pub clock: Arc<dyn Clock>,
    pub pinned: Option<WallTime>,
}

pub fn select_clock(at: Option<WallTime>) -> SelectedClock {
    match at {
        Some(at) => SelectedClock {
            clock: Arc::new(FixedClock::new(at)),
            pinned: Some(at),
        },
        None => SelectedClock {
            clock: Arc::new(SystemClock),
            pinned: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use chrono_tz::America::New_York;
    use chrono_tz::Asia::Jakarta;

    use super::*;

    #[test]
    fn wall_time_follows_the_zone_of_the_instant() {
        // 2026-03-02 is a Monday.
        let instant = Utc
            .with_ymd_and_hms(2026, 3, 2, 1, 30, 0)
            .single()
            .expect("valid instant");

        let jakarta = wall_time_at(&instant.with_timezone(&Jakarta));
        assert_eq!(jakarta.day, Day::Senin);
        assert_eq!(jakarta.time.to_string(), "08:30");

        let new_york = wall_time_at(&instant.with_timezone(&New_York));
        assert_eq!(new_york.day, Day::Minggu);
        assert_eq!(new_york.time.to_string(), "20:30");
    }

    #[test]
    fn fixed_clock_is_pinned() {
        let at: WallTime = "Rabu 10:15".parse().expect("wall time");
        let selected = select_clock(Some(at));
        assert_eq!(selected.pinned, Some(at));
        assert_eq!(selected.clock.label(), "FIXED");
        assert_eq!(selected.clock.now().expect("now"), at);
        assert_eq!(selected.clock.now().expect("now again"), at);
    }

    #[test]
    fn system_clock_is_selected_without_pin() {
        let selected = select_clock(None);
        assert!(selected.pinned.is_none());
        assert_eq!(selected.clock.label(), "SYSTEM_LOCAL");
        let now = selected.clock.now().expect("system clock");
        assert!(now.minutes() < 24 * 60);
    }
}
