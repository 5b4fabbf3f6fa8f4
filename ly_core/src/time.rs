// ABOUTME: Utilities for working with times and timestamps.
// ABOUTME: Provides RFC3339 formatting and calendar date checks.
use ::time::{macros::format_description, Date, OffsetDateTime};
use std::time::SystemTime;

/// Get the current system time
pub fn utc_now() -> SystemTime {
    SystemTime::now()
}

/// Convert a SystemTime to an RFC3339 timestamp string with microseconds
///
/// # Examples
///
/// ```
/// use ly_core::to_rfc3339;
/// use std::time::{Duration, UNIX_EPOCH};
///
/// let time = UNIX_EPOCH + Duration::from_secs(1_609_459_200); // 2021-01-01
/// assert_eq!(to_rfc3339(time), "2021-01-01T00:00:00.000000Z");
/// ```
pub fn to_rfc3339(time: SystemTime) -> String {
    // Fixed-width fraction keeps stored stamps sorting lexically in time order
    let format = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
    );
    OffsetDateTime::from(time)
        .format(format)
        .unwrap_or_default()
}

/// Get current time as an RFC3339 formatted string
pub fn now_iso8601() -> String {
    to_rfc3339(utc_now())
}

/// Check that a string is a real calendar date in `YYYY-MM-DD` form
///
/// # Examples
///
/// ```
/// use ly_core::time::is_calendar_date;
/// assert!(is_calendar_date("2000-02-29"));
/// assert!(!is_calendar_date("2001-02-29"));
/// ```
pub fn is_calendar_date(value: &str) -> bool {
    Date::parse(value, format_description!("[year]-[month]-[day]")).is_ok()
}
