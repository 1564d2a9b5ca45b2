//! Time utilities for bluehour
//!
//! Provides wall-clock time (for timestamps and "today"), monotonic time
//! (for the admission guard) and calendar-day helpers. Calendar days carry
//! no time-of-day or timezone: an entry's date is an opaque day chosen by
//! the person writing it.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `BLUEHOUR_MOCK_TIME` environment variable can be set
//! to override the system time for all time-sensitive operations. This is
//! handy for looking at reports "as of" a given day.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`)
//!
//! ```bash
//! BLUEHOUR_MOCK_TIME="2025-12-25 14:30:00" cargo run -p bluehourd
//! ```

use chrono::{DateTime, Days, Local, NaiveDate, NaiveDateTime, TimeZone};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "BLUEHOUR_MOCK_TIME";

/// ISO calendar date format used on the wire and in storage
pub const CALENDAR_DATE_FORMAT: &str = "%Y-%m-%d";

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match parse_mock_time(&mock_time_str) {
                    Some(mock_dt) => {
                        let offset = mock_dt.signed_duration_since(chrono::Local::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    None => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = "%Y-%m-%d %H:%M:%S",
                            "Invalid mock time, using system time"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

fn parse_mock_time(value: &str) -> Option<DateTime<Local>> {
    let naive_dt = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").ok()?;
    Local.from_local_datetime(&naive_dt).single()
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    if let Some(offset) = get_mock_time_offset() {
        real_now + offset
    } else {
        real_now
    }
}

/// The current local calendar day.
pub fn today() -> NaiveDate {
    now().date_naive()
}

/// Parse a strict ISO `YYYY-MM-DD` calendar date.
///
/// chrono accepts unpadded fields (`2025-1-5`); we don't, so that dates
/// compare the same way as strings and as days.
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(value, CALENDAR_DATE_FORMAT).ok()
}

/// Format a calendar date as `YYYY-MM-DD`.
pub fn format_calendar_date(date: NaiveDate) -> String {
    date.format(CALENDAR_DATE_FORMAT).to_string()
}

/// Longest range [`trailing_days`] will produce, about ten years.
pub const MAX_TRAILING_DAYS: i64 = 3660;

/// Inclusive range of calendar days ending at `end` and spanning `days` days.
///
/// `days` is clamped to `1..=MAX_TRAILING_DAYS`, so the range always contains
/// `end`. Near the start of the calendar the range is cut at
/// [`NaiveDate::MIN`].
pub fn trailing_days(end: NaiveDate, days: i64) -> (NaiveDate, NaiveDate) {
    let span = days.clamp(1, MAX_TRAILING_DAYS) as u64 - 1;
    let start = end.checked_sub_days(Days::new(span)).unwrap_or(NaiveDate::MIN);
    (start, end)
}

/// Iterate every calendar day from `start` to `end`, both inclusive.
pub fn each_day(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

/// Represents a point in monotonic time, immune to wall-clock changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonotonicInstant(Instant);

impl MonotonicInstant {
    pub fn now() -> Self {
        Self(Instant::now())
    }

    /// Duration since `earlier`, or zero if `earlier` is actually later.
    pub fn duration_since(&self, earlier: MonotonicInstant) -> Duration {
        self.0.saturating_duration_since(earlier.0)
    }

    pub fn checked_add(&self, duration: Duration) -> Option<MonotonicInstant> {
        self.0.checked_add(duration).map(MonotonicInstant)
    }
}

impl std::ops::Add<Duration> for MonotonicInstant {
    type Output = MonotonicInstant;

    fn add(self, rhs: Duration) -> Self::Output {
        MonotonicInstant(self.0 + rhs)
    }
}

/// Format a timestamp for display with full date and time.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_calendar_date() {
        assert_eq!(parse_calendar_date("2025-12-25"), Some(date(2025, 12, 25)));
        assert_eq!(parse_calendar_date("2024-02-29"), Some(date(2024, 2, 29)));

        assert_eq!(parse_calendar_date("2025-02-29"), None);
        assert_eq!(parse_calendar_date("2025-1-5"), None);
        assert_eq!(parse_calendar_date("2025-13-01"), None);
        assert_eq!(parse_calendar_date("25-12-2025"), None);
        assert_eq!(parse_calendar_date("2025-12-25T10:00:00Z"), None);
        assert_eq!(parse_calendar_date(""), None);
    }

    #[test]
    fn test_format_calendar_date() {
        assert_eq!(format_calendar_date(date(2025, 1, 5)), "2025-01-05");
    }

    #[test]
    fn test_trailing_days() {
        let end = date(2025, 3, 2);
        assert_eq!(trailing_days(end, 1), (end, end));
        assert_eq!(trailing_days(end, 7), (date(2025, 2, 24), end));

        // Clamped to at least one day
        assert_eq!(trailing_days(end, 0), (end, end));
        assert_eq!(trailing_days(end, -3), (end, end));
    }

    #[test]
    fn test_trailing_days_is_bounded() {
        let end = date(2025, 3, 2);
        let (start, _) = trailing_days(end, i64::MAX);
        assert_eq!(start, trailing_days(end, MAX_TRAILING_DAYS).0);
        assert_eq!(each_day(start, end).count() as i64, MAX_TRAILING_DAYS);

        let (start, _) = trailing_days(NaiveDate::MIN, 30);
        assert_eq!(start, NaiveDate::MIN);
    }

    #[test]
    fn test_each_day_crosses_month_boundary() {
        let days: Vec<_> = each_day(date(2024, 2, 27), date(2024, 3, 1)).collect();
        assert_eq!(
            days,
            vec![date(2024, 2, 27), date(2024, 2, 28), date(2024, 2, 29), date(2024, 3, 1)]
        );

        assert_eq!(each_day(date(2024, 3, 1), date(2024, 3, 1)).count(), 1);
        assert_eq!(each_day(date(2024, 3, 2), date(2024, 3, 1)).count(), 0);
    }

    #[test]
    fn test_monotonic_instant() {
        let t1 = MonotonicInstant::now();
        let t2 = t1 + Duration::from_millis(250);

        assert_eq!(t2.duration_since(t1), Duration::from_millis(250));
        assert_eq!(t1.duration_since(t2), Duration::ZERO);
        assert_eq!(t1.checked_add(Duration::from_secs(1)), Some(t1 + Duration::from_secs(1)));
    }

    #[test]
    fn test_parse_mock_time_format() {
        assert!(parse_mock_time("2025-12-25 14:30:00").is_some());
        assert!(parse_mock_time("2025-12-25").is_none());
        assert!(parse_mock_time("14:30:00").is_none());
        assert!(parse_mock_time("2025-12-25T14:30:00").is_none());
    }

    #[test]
    fn test_today_matches_now() {
        let before = now().date_naive();
        let day = today();
        let after = now().date_naive();
        assert!(day >= before && day <= after);
    }

    #[test]
    fn test_format_datetime_full() {
        let dt = Local.with_ymd_and_hms(2025, 12, 25, 14, 30, 45).unwrap();
        assert_eq!(format_datetime_full(&dt), "2025-12-25 14:30:45");
    }
}
