//! Time helpers for calendar entries.
//!
//! Entries carry their start and end as UTC epoch milliseconds. Feed
//! timestamps arrive as wall-clock values (`yyyyMMdd'T'HHmmss`) and are
//! converted here without consulting a timezone database: the wall-clock
//! value is taken as UTC and the timezone identifier travels alongside it.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// The compact iCalendar date-time layout, e.g. `20240517T090000`.
pub const ICS_DATETIME_FORMAT: &str = "%Y%m%dT%H%M%S";

/// The compact iCalendar date layout, e.g. `20240517`.
pub const ICS_DATE_FORMAT: &str = "%Y%m%d";

/// Minutes in one day, the unit reminders are expressed in.
pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Parses a compact iCalendar timestamp (`yyyyMMdd'T'HHmmss`).
///
/// A trailing `Z` is accepted and ignored; callers decide what it means for
/// the timezone identifier.
pub fn parse_ics_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(value, ICS_DATETIME_FORMAT).ok()
}

/// Converts a wall-clock timestamp to epoch milliseconds, treating it as UTC.
pub fn to_epoch_millis(dt: NaiveDateTime) -> i64 {
    dt.and_utc().timestamp_millis()
}

/// Converts epoch milliseconds back to a UTC datetime.
///
/// Returns `None` when the value is outside chrono's representable range.
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Returns `23:59:59` on the given calendar day.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default())
}

/// Formats epoch milliseconds for log and error messages.
pub fn format_millis(millis: i64) -> String {
    match from_epoch_millis(millis) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => millis.to_string(),
    }
}
