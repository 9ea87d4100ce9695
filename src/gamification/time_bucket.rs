//! Calendar-day utilities for streak tracking
//!
//! Streaks move on calendar days, not on elapsed time. Every timestamp is
//! projected onto a single reference timezone (a fixed UTC offset) and only
//! the date part is compared.
//! - Day buckets: "YYYY-MM-DD", the storage format for streak dates

use std::sync::RwLock;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};

const DAY_BUCKET_FORMAT: &str = "%Y-%m-%d";

/// Source of the current time.
///
/// Injected into the engine so tests can move through calendar days.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Clock sitting at noon UTC of the given date
    pub fn at_date(date: NaiveDate) -> Self {
        let noon = date
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);
        Self::new(noon)
    }

    pub fn set(&self, now: DateTime<Utc>) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard = now;
    }

    pub fn advance_days(&self, days: i64) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard += Duration::days(days);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Build the reference timezone from a minute offset.
pub fn reference_offset(utc_offset_minutes: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(utc_offset_minutes.checked_mul(60)?)
}

/// Calendar date of a timestamp in the reference timezone.
pub fn calendar_day(timestamp: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    timestamp.with_timezone(&offset).date_naive()
}

/// Compute the day bucket string for a date.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use momentum::gamification::day_bucket;
///
/// let date = NaiveDate::from_ymd_opt(2023, 12, 28).unwrap();
/// assert_eq!(day_bucket(date), "2023-12-28");
/// ```
pub fn day_bucket(date: NaiveDate) -> String {
    date.format(DAY_BUCKET_FORMAT).to_string()
}

/// Parse a day bucket string back to a date.
pub fn parse_day_bucket(bucket: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(bucket, DAY_BUCKET_FORMAT).ok()
}

/// Convert a millisecond timestamp from storage.
pub fn from_millis(timestamp_ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(timestamp_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_calendar_day_respects_offset() {
        // 23:30 UTC on the 28th is already the 29th in UTC+02:00
        let ts = Utc.with_ymd_and_hms(2023, 12, 28, 23, 30, 0).unwrap();
        let utc = reference_offset(0).unwrap();
        let cest = reference_offset(120).unwrap();

        assert_eq!(calendar_day(ts, utc), NaiveDate::from_ymd_opt(2023, 12, 28).unwrap());
        assert_eq!(calendar_day(ts, cest), NaiveDate::from_ymd_opt(2023, 12, 29).unwrap());
    }

    #[test]
    fn test_reference_offset_bounds() {
        assert!(reference_offset(-18 * 60).is_some());
        assert!(reference_offset(25 * 60).is_none());
        assert!(reference_offset(i32::MAX).is_none());
    }

    #[test]
    fn test_day_bucket_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(parse_day_bucket(&day_bucket(date)), Some(date));
        assert_eq!(parse_day_bucket("not-a-date"), None);
    }

    #[test]
    fn test_fixed_clock_advances() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let clock = FixedClock::at_date(start);
        clock.advance_days(1);
        let utc = reference_offset(0).unwrap();
        assert_eq!(
            calendar_day(clock.now(), utc),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
    }
}
