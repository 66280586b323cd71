//! ICS/iCalendar parsing.
//!
//! The feed is read line by line rather than through a full RFC 5545 parser:
//! only `VEVENT` blocks and the keys `SUMMARY`, `STATUS`, `CATEGORIES`,
//! `LOCATION`, `DTSTART` and `DTEND` matter, everything else is ignored.
//!
//! ```text
//! BEGIN:VCALENDAR          <- preamble, dropped
//! BEGIN:VEVENT             <- chunk boundary
//! SUMMARY:Drill
//! STATUS:CONFIRMED
//! DTSTART;TZID=Europe/Berlin:20240517T190000
//! END:VEVENT
//! ```

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use kalsync_core::time::{ICS_DATE_FORMAT, end_of_day, parse_ics_datetime, to_epoch_millis};
use kalsync_core::{CalendarEntry, DEFAULT_TIMEZONE, EntryState};
use tracing::{debug, trace};

use crate::error::ParseError;

/// Literal that separates event blocks.
pub const EVENT_DELIMITER: &str = "BEGIN:VEVENT";

const CALENDAR_START: &str = "BEGIN:VCALENDAR";

/// Parses an ICS body into entries.
///
/// The text before the first `BEGIN:VEVENT` is the calendar preamble and is
/// dropped. Blocks that lack a title, a status or a start are skipped.
///
/// # Errors
///
/// Returns [`ParseError::InvalidTimestamp`] when a date value cannot be read;
/// that aborts the whole parse.
pub fn parse(body: &str) -> Result<Vec<CalendarEntry>, ParseError> {
    let mut entries = Vec::new();

    for (index, chunk) in body.split(EVENT_DELIMITER).enumerate().skip(1) {
        if chunk.trim().is_empty() {
            continue;
        }
        match parse_chunk(index - 1, chunk) {
            Ok(entry) => {
                trace!(entry = %entry.label(), state = %entry.entry_state, "Parsed entry");
                entries.push(entry);
            }
            Err(err) if err.is_chunk_local() => debug!(error = %err, "Skipping event block"),
            Err(err) => return Err(err),
        }
    }

    debug!(count = entries.len(), "Parsed feed");
    Ok(entries)
}

/// Parses one event block (the text following a `BEGIN:VEVENT`).
///
/// # Errors
///
/// Returns [`ParseError::MalformedChunk`] when the block contains a
/// `BEGIN:VCALENDAR` line or lacks a required field, and
/// [`ParseError::InvalidTimestamp`] for unreadable dates.
pub fn parse_chunk(index: usize, chunk: &str) -> Result<CalendarEntry, ParseError> {
    let mut fields = ChunkFields::default();

    for line in chunk.lines() {
        if line == CALENDAR_START {
            return Err(ParseError::malformed(index, "unexpected BEGIN:VCALENDAR"));
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        fields.apply(&key.replace('\t', ""), value)?;
    }

    fields.into_entry(index)
}

/// Values collected from one block before validation.
#[derive(Debug, Default)]
struct ChunkFields {
    title: Option<String>,
    state: Option<EntryState>,
    category: Option<String>,
    location: Option<String>,
    timezone: Option<String>,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
}

impl ChunkFields {
    fn apply(&mut self, key: &str, value: &str) -> Result<(), ParseError> {
        let mut segments = key.split(';');
        let name = segments.next().unwrap_or_default();
        let params: Vec<(&str, &str)> = segments.filter_map(|p| p.split_once('=')).collect();

        match name {
            "SUMMARY" => self.title = Some(value.to_string()),
            "STATUS" => self.state = Some(EntryState::from_ics_status(value)),
            "CATEGORIES" => self.category = Some(value.replace("\\,", "-")),
            "LOCATION" => self.location = Some(value.to_string()),
            "DTSTART" => {
                let (start, timezone) = parse_time_value(name, &params, value)?;
                self.start = Some(start);
                if timezone.is_some() {
                    self.timezone = timezone;
                }
            }
            "DTEND" => self.end = Some(parse_time_value(name, &params, value)?.0),
            _ => {}
        }
        Ok(())
    }

    fn into_entry(self, index: usize) -> Result<CalendarEntry, ParseError> {
        let title = self
            .title
            .ok_or_else(|| ParseError::malformed(index, "missing SUMMARY"))?;
        let state = self
            .state
            .ok_or_else(|| ParseError::malformed(index, "missing STATUS"))?;
        let start = self
            .start
            .ok_or_else(|| ParseError::malformed(index, "missing DTSTART"))?;
        let end = self.end.unwrap_or_else(|| end_of_day(start.date()));

        let category = self.category.unwrap_or_default();
        let description = if category.is_empty() {
            state.status_line().to_string()
        } else {
            format!("{}\n{}", category, state.status_line())
        };

        Ok(
            CalendarEntry::new(title, to_epoch_millis(start), to_epoch_millis(end))
                .with_description(description)
                .with_category(category)
                .with_location(self.location.unwrap_or_default())
                .with_timezone(self.timezone.unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()))
                .with_state(state),
        )
    }
}

/// Reads a `DTSTART`/`DTEND` value and the timezone it names, if any.
fn parse_time_value(
    property: &str,
    params: &[(&str, &str)],
    value: &str,
) -> Result<(NaiveDateTime, Option<String>), ParseError> {
    let value = value.trim();
    let invalid = || ParseError::InvalidTimestamp {
        property: property.to_string(),
        value: value.to_string(),
    };
    let param = |name: &str| {
        params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, v)| *v)
    };

    if param("VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE")) {
        let date = NaiveDate::parse_from_str(value, ICS_DATE_FORMAT).map_err(|_| invalid())?;
        return Ok((date.and_time(NaiveTime::default()), None));
    }

    let timestamp = parse_ics_datetime(value).ok_or_else(invalid)?;
    let timezone = match param("TZID") {
        Some(tzid) => Some(tzid.trim_matches('"').to_string()),
        None if value.ends_with('Z') => Some("UTC".to_string()),
        None => None,
    };
    Ok((timestamp, timezone))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kalsync_core::time::format_millis;

    const SAMPLE_ICS: &str = "BEGIN:VCALENDAR\r
VERSION:2.0\r
PRODID:-//Example//Duty Roster//EN\r
BEGIN:VEVENT\r
\tSUMMARY:Evening drill\r
\tSTATUS:TENTATIVE\r
\tCATEGORIES:Training\\, Group 1\r
\tLOCATION:Station 2\r
\tDTSTART;TZID=Europe/Berlin:20240417T190000\r
\tDTEND;TZID=Europe/Berlin:20240417T213000\r
END:VEVENT\r
BEGIN:VEVENT\r
SUMMARY:Open day\r
STATUS:CONFIRMED\r
DTSTART;VALUE=DATE:20240601\r
DTEND;VALUE=DATE:20240602\r
END:VEVENT\r
BEGIN:VEVENT\r
SUMMARY:Cancelled exercise\r
STATUS:CANCELLED\r
DTSTART:20240701T080000Z\r
END:VEVENT\r
END:VCALENDAR\r
";

    #[test]
    fn scenario_all_day_entry() {
        let body = "BEGIN:VCALENDAR\nBEGIN:VEVENT\nSUMMARY:Meeting\nSTATUS:CONFIRMED\nDTSTART;VALUE=DATE:20240517\n";
        let entries = parse(body).unwrap();

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.title, "Meeting");
        assert_eq!(entry.entry_state, EntryState::Confirmed);
        assert_eq!(format_millis(entry.start_millis), "2024-05-17 00:00:00");
        assert_eq!(format_millis(entry.end_millis), "2024-05-17 23:59:59");
        assert_eq!(entry.timezone, "Europe/Berlin");
        assert_eq!(entry.description, "confirmed");
    }

    #[test]
    fn parses_sample_feed() {
        let entries = parse(SAMPLE_ICS).unwrap();
        assert_eq!(entries.len(), 3);

        let drill = &entries[0];
        assert_eq!(drill.title, "Evening drill");
        assert_eq!(drill.entry_state, EntryState::Open);
        assert_eq!(drill.category, "Training- Group 1");
        assert_eq!(drill.description, "Training- Group 1\nno response yet");
        assert_eq!(drill.location, "Station 2");
        assert_eq!(drill.timezone, "Europe/Berlin");
        assert_eq!(format_millis(drill.start_millis), "2024-04-17 19:00:00");
        assert_eq!(format_millis(drill.end_millis), "2024-04-17 21:30:00");

        let open_day = &entries[1];
        assert_eq!(format_millis(open_day.end_millis), "2024-06-02 00:00:00");

        let cancelled = &entries[2];
        assert_eq!(cancelled.entry_state, EntryState::Canceled);
        assert_eq!(cancelled.timezone, "UTC");
        assert_eq!(cancelled.description, "status unknown");
    }

    #[test]
    fn entries_never_exceed_event_blocks() {
        let body = "BEGIN:VEVENT\nSUMMARY:No status\nDTSTART:20240101T100000\nEND:VEVENT\n\
                    BEGIN:VEVENT\nSTATUS:CONFIRMED\nDTSTART:20240101T100000\nEND:VEVENT\n\
                    BEGIN:VEVENT\nSUMMARY:No start\nSTATUS:CONFIRMED\nEND:VEVENT\n\
                    BEGIN:VEVENT\nSUMMARY:Complete\nSTATUS:CONFIRMED\nDTSTART:20240101T100000\nEND:VEVENT\n";

        let entries = parse(body).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Complete");
    }

    #[test]
    fn text_without_events_yields_nothing() {
        let body = "SUMMARY:Stray\nSTATUS:CONFIRMED\nDTSTART:20240101T100000\n";
        assert!(parse(body).unwrap().is_empty());
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn unknown_status_value_is_kept_as_unknown() {
        let body = "BEGIN:VEVENT\nSUMMARY:Odd\nSTATUS:NEEDS-ACTION\nDTSTART:20240101T100000\n";
        let entries = parse(body).unwrap();
        assert_eq!(entries[0].entry_state, EntryState::Unknown);
        assert_eq!(entries[0].description, "status unknown");
    }

    #[test]
    fn nested_calendar_start_rejects_chunk() {
        let chunk = "\nBEGIN:VCALENDAR\nSUMMARY:Broken\nSTATUS:CONFIRMED\nDTSTART:20240101T100000\n";
        let err = parse_chunk(4, chunk).unwrap_err();
        assert_eq!(
            err,
            ParseError::MalformedChunk {
                index: 4,
                reason: "unexpected BEGIN:VCALENDAR".into()
            }
        );
        assert!(parse(&format!("{}{}", EVENT_DELIMITER, chunk)).unwrap().is_empty());
    }

    #[test]
    fn malformed_date_aborts_parse() {
        let body = "BEGIN:VEVENT\nSUMMARY:Ok\nSTATUS:CONFIRMED\nDTSTART:20240101T100000\n\
                    BEGIN:VEVENT\nSUMMARY:Bad\nSTATUS:CONFIRMED\nDTSTART;TZID=Europe/Berlin:2024-01-01\n";

        let err = parse(body).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidTimestamp {
                property: "DTSTART".into(),
                value: "2024-01-01".into()
            }
        );
    }

    #[test]
    fn end_before_start_is_clamped() {
        let body = "BEGIN:VEVENT\nSUMMARY:Backwards\nSTATUS:CONFIRMED\n\
                    DTSTART:20240101T100000\nDTEND:20240101T090000\n";
        let entries = parse(body).unwrap();
        let entry = &entries[0];
        assert_eq!(entry.start_millis, entry.end_millis);
    }

    #[test]
    fn values_may_contain_colons() {
        let body = "BEGIN:VEVENT\nSUMMARY:Briefing: vehicles\nSTATUS:CONFIRMED\n\
                    LOCATION:https://example.com/room\nDTSTART:20240101T100000\n";
        let entries = parse(body).unwrap();
        let entry = &entries[0];
        assert_eq!(entry.title, "Briefing: vehicles");
        assert_eq!(entry.location, "https://example.com/room");
    }

    #[test]
    fn lines_without_colon_are_ignored() {
        let body = "BEGIN:VEVENT\nSUMMARY:Folded\n continuation\nSTATUS:CONFIRMED\nDTSTART:20240101T100000\n";
        assert_eq!(parse(body).unwrap().len(), 1);
    }
}
