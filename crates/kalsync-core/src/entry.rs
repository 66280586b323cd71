//! Calendar entry types.
//!
//! This module provides the record exchanged between the feed parser, the
//! reconciliation engine and the calendar store:
//! - [`CalendarEntry`]: one appointment with start/end as UTC epoch millis
//! - [`EntryState`]: the participation state reported by the feed

use serde::{Deserialize, Serialize};

use crate::time::format_millis;

/// Timezone identifier used when the feed does not name one.
pub const DEFAULT_TIMEZONE: &str = "Europe/Berlin";

/// The participation state of an entry as reported by the feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// The appointment is confirmed.
    Confirmed,
    /// The user declined the appointment.
    Declined,
    /// No response has been given yet (`TENTATIVE` in the feed).
    Open,
    /// The appointment was cancelled by the organizer.
    Canceled,
    /// The feed reported a status we do not recognise.
    #[default]
    Unknown,
}

impl EntryState {
    /// Maps an iCalendar `STATUS` value to an entry state.
    pub fn from_ics_status(value: &str) -> Self {
        match value.trim() {
            "CONFIRMED" => Self::Confirmed,
            "TENTATIVE" => Self::Open,
            "CANCELLED" => Self::Canceled,
            _ => Self::Unknown,
        }
    }

    /// Returns the human-readable status line appended to descriptions.
    pub fn status_line(&self) -> &'static str {
        match self {
            Self::Open => "no response yet",
            Self::Declined => "declined",
            Self::Confirmed => "confirmed",
            Self::Canceled | Self::Unknown => "status unknown",
        }
    }

    /// Returns true if entries in this state should be written to the calendar.
    pub fn is_importable(&self) -> bool {
        !matches!(self, Self::Canceled | Self::Declined)
    }

    /// Returns a short machine-friendly name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Declined => "declined",
            Self::Open => "open",
            Self::Canceled => "canceled",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EntryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single appointment.
///
/// `source_id` is the identifier assigned by the calendar store and stays
/// `None` until the entry has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    /// Title (`SUMMARY`).
    pub title: String,
    /// Start as UTC epoch milliseconds.
    pub start_millis: i64,
    /// End as UTC epoch milliseconds, never before `start_millis`.
    pub end_millis: i64,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Location (`LOCATION`).
    #[serde(default)]
    pub location: String,
    /// Category (`CATEGORIES`).
    #[serde(default)]
    pub category: String,
    /// Timezone identifier, passed through untouched.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Participation state.
    #[serde(default)]
    pub entry_state: EntryState,
    /// Store identifier, set once persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<i64>,
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

impl CalendarEntry {
    /// Creates a new entry; `end_millis` is raised to `start_millis` if it lies before it.
    pub fn new(title: impl Into<String>, start_millis: i64, end_millis: i64) -> Self {
        Self {
            title: title.into(),
            start_millis,
            end_millis: end_millis.max(start_millis),
            description: String::new(),
            location: String::new(),
            category: String::new(),
            timezone: default_timezone(),
            entry_state: EntryState::Unknown,
            source_id: None,
        }
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Builder method to set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Builder method to set the timezone identifier.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Builder method to set the entry state.
    pub fn with_state(mut self, state: EntryState) -> Self {
        self.entry_state = state;
        self
    }

    /// Builder method to set the store identifier.
    pub fn with_source_id(mut self, id: i64) -> Self {
        self.source_id = Some(id);
        self
    }

    /// Returns true if both entries describe the same appointment.
    ///
    /// Title, description, start and end must match exactly; no case folding
    /// or whitespace normalization is applied.
    pub fn content_eq(&self, other: &CalendarEntry) -> bool {
        self.start_millis == other.start_millis
            && self.end_millis == other.end_millis
            && self.title == other.title
            && self.description == other.description
    }

    /// Returns a short label for logs and error messages.
    pub fn label(&self) -> String {
        format!("'{}' at {}", self.title, format_millis(self.start_millis))
    }
}
