//! Reminder policy for inserted entries.

use kalsync_core::{EntryState, MINUTES_PER_DAY};
use serde::{Deserialize, Serialize};

/// Which reminders to attach to newly inserted entries.
///
/// `intelligent` only has an effect while `enabled` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPolicy {
    /// Attach reminders at all.
    pub enabled: bool,
    /// Choose reminders by entry state instead of a single fixed one.
    pub intelligent: bool,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            intelligent: true,
        }
    }
}

impl ReminderPolicy {
    /// No reminders.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            intelligent: false,
        }
    }

    /// One reminder two days ahead for every entry.
    pub fn plain() -> Self {
        Self {
            enabled: true,
            intelligent: false,
        }
    }

    /// Returns the reminder offsets, in minutes before the start.
    ///
    /// Intelligent mode reminds unanswered entries a week ahead in addition
    /// to the two-day and one-day reminders confirmed entries get.
    pub fn minutes_for(&self, state: EntryState) -> Vec<i64> {
        if !self.enabled {
            return Vec::new();
        }
        if !self.intelligent {
            return vec![2 * MINUTES_PER_DAY];
        }
        match state {
            EntryState::Open => vec![7 * MINUTES_PER_DAY, 2 * MINUTES_PER_DAY, MINUTES_PER_DAY],
            EntryState::Confirmed => vec![2 * MINUTES_PER_DAY, MINUTES_PER_DAY],
            _ => Vec::new(),
        }
    }
}
