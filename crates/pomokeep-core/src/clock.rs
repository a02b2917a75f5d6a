//! Wall-clock time source.
//!
//! Every duration the engine reports is derived from an absolute end
//! timestamp and `Clock::now()`, so the clock is injected rather than read
//! from the environment. Tests drive a [`ManualClock`] forward explicitly.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, Utc};

/// Absolute point in time, carrying the offset it was observed in.
pub type Timestamp = DateTime<FixedOffset>;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Calendar date in the offset the clock reports (device-local for the
    /// system clock).
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// The device clock, in the device's local offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Local::now().fixed_offset()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can hand one clone to
/// the engine and keep another to advance.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// A clock at 09:00:00 UTC on the given date.
    pub fn at_date(year: i32, month: u32, day: u32) -> Self {
        let start = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .map(|dt| dt.and_utc().fixed_offset())
            .unwrap_or_else(|| DateTime::<Utc>::default().fixed_offset());
        Self::new(start)
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }

    pub fn set(&self, to: Timestamp) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Canonical `YYYY-MM-DD` key for a calendar date.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a `YYYY-MM-DD` key back into a date.
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}
