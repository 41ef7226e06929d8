//! Local-calendar date keys for stats aggregation
//!
//! All keys use the caller's local calendar day boundary, not UTC,
//! so activity recorded near midnight lands on the right day.
//! - Day keys: "YYYY-MM-DD"
//! - Month keys: "YYYY-MM"

use chrono::{DateTime, Datelike, Local, NaiveDate};

/// Source of "now" for the engine. Injected so tests can pin and
/// advance the calendar day.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    /// Current time, milliseconds since epoch
    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// Today's local calendar date
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Real wall clock in the local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Manually advanced clock for tests
#[derive(Debug)]
pub struct FixedClock {
    now: std::sync::Mutex<DateTime<Local>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Local>) {
        *self.now.lock().expect("clock lock poisoned") = now;
    }

    pub fn advance_days(&self, days: i64) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now += chrono::Duration::days(days);
    }

    pub fn advance_hours(&self, hours: i64) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now += chrono::Duration::hours(hours);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().expect("clock lock poisoned")
    }
}

/// Day key ("YYYY-MM-DD") for a local calendar date
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Month key ("YYYY-MM") for a local calendar date
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Day key for a millisecond timestamp, in local time
pub fn day_key_for_ms(timestamp_ms: i64) -> String {
    let dt = DateTime::from_timestamp_millis(timestamp_ms)
        .map(|utc| utc.with_timezone(&Local))
        .unwrap_or_else(Local::now);
    day_key(dt.date_naive())
}

/// Parse a "YYYY-MM-DD" day key
pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

/// Parse a "YYYY-MM" month key into (year, month)
pub fn parse_month_key(key: &str) -> Option<(i32, u32)> {
    let (year, month) = key.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    if (1..=12).contains(&month) {
        Some((year, month))
    } else {
        None
    }
}
