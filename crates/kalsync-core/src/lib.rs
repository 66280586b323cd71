//! Core types: calendar entries, entry states, time helpers, tracing

pub mod entry;
pub mod time;
pub mod tracing;

pub use entry::{CalendarEntry, DEFAULT_TIMEZONE, EntryState};
pub use time::{
    ICS_DATE_FORMAT, ICS_DATETIME_FORMAT, MINUTES_PER_DAY, end_of_day, format_millis,
    from_epoch_millis, parse_ics_datetime, to_epoch_millis,
};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
