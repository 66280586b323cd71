//! Calendar store adapter.
//!
//! The reconciliation engine never talks to a calendar directly; it goes
//! through [`CalendarStore`]. Two implementations ship with this crate:
//! [`MemoryStore`](crate::memory::MemoryStore) and
//! [`JsonFileStore`](crate::file_store::JsonFileStore). Both keep their rows
//! in an [`EntryTable`].

use std::collections::{BTreeMap, BTreeSet};

use kalsync_core::CalendarEntry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crowd::Crowd;
use crate::error::{StoreError, StoreResult};

/// Organizer value written into every entry this tool creates.
pub const ORGANIZER_MARKER: &str = "kalsync@localhost";

/// Read/write access to the local calendar.
///
/// Entries returned by the list methods carry their `source_id`.
pub trait CalendarStore: Send {
    /// Returns the entries whose identifiers are in `known_ids`.
    fn list_existing(&self, known_ids: &BTreeSet<i64>) -> StoreResult<Vec<CalendarEntry>>;

    /// Returns the entries whose organizer equals `marker`.
    fn list_by_marker(&self, marker: &str) -> StoreResult<Vec<CalendarEntry>>;

    /// Writes a new entry tagged with `marker` and returns its identifier.
    fn insert(&mut self, entry: &CalendarEntry, marker: &str) -> StoreResult<i64>;

    /// Removes an entry.
    fn delete(&mut self, id: i64) -> StoreResult<()>;

    /// Adds a reminder `minutes_before` the entry starts.
    fn attach_reminder(&mut self, id: i64, minutes_before: i64) -> StoreResult<()>;
}

impl<S: CalendarStore + ?Sized> CalendarStore for Box<S> {
    fn list_existing(&self, known_ids: &BTreeSet<i64>) -> StoreResult<Vec<CalendarEntry>> {
        (**self).list_existing(known_ids)
    }

    fn list_by_marker(&self, marker: &str) -> StoreResult<Vec<CalendarEntry>> {
        (**self).list_by_marker(marker)
    }

    fn insert(&mut self, entry: &CalendarEntry, marker: &str) -> StoreResult<i64> {
        (**self).insert(entry, marker)
    }

    fn delete(&mut self, id: i64) -> StoreResult<()> {
        (**self).delete(id)
    }

    fn attach_reminder(&mut self, id: i64, minutes_before: i64) -> StoreResult<()> {
        (**self).attach_reminder(id, minutes_before)
    }
}

/// Loads the crowd for one run.
///
/// Without known identifiers the marker query alone is used. Otherwise the
/// entries found by identifier are merged into the marker result, so an entry
/// found both ways appears once.
pub fn load_snapshot<S: CalendarStore + ?Sized>(
    store: &S,
    known_ids: &BTreeSet<i64>,
    marker: &str,
) -> StoreResult<Crowd> {
    let mut crowd = Crowd::from_entries(store.list_by_marker(marker)?);
    let by_marker = crowd.len();

    if !known_ids.is_empty() {
        for entry in store.list_existing(known_ids)? {
            crowd.merge(entry);
        }
    }

    debug!(
        by_marker,
        by_id = crowd.len() - by_marker,
        "Loaded existing entries"
    );
    Ok(crowd)
}

/// One stored row: the entry plus what the store attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub entry: CalendarEntry,
    pub organizer: String,
    #[serde(default)]
    pub reminders: Vec<i64>,
}

/// Rows keyed by identifier, shared by the bundled stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTable {
    next_id: i64,
    rows: BTreeMap<i64, StoredEntry>,
}

impl Default for EntryTable {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl EntryTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the row with the given identifier.
    pub fn get(&self, id: i64) -> Option<&StoredEntry> {
        self.rows.get(&id)
    }

    /// Iterates rows in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &StoredEntry)> {
        self.rows.iter().map(|(id, row)| (*id, row))
    }

    fn collect<F>(&self, mut keep: F) -> Vec<CalendarEntry>
    where
        F: FnMut(i64, &StoredEntry) -> bool,
    {
        let mut entries: Vec<CalendarEntry> = self
            .rows
            .iter()
            .filter(|(id, row)| keep(**id, row))
            .map(|(id, row)| row.entry.clone().with_source_id(*id))
            .collect();
        entries.sort_by_key(|e| e.start_millis);
        entries
    }

    pub fn list_existing(&self, known_ids: &BTreeSet<i64>) -> Vec<CalendarEntry> {
        self.collect(|id, _| known_ids.contains(&id))
    }

    pub fn list_by_marker(&self, marker: &str) -> Vec<CalendarEntry> {
        self.collect(|_, row| row.organizer == marker)
    }

    /// Stores a copy of `entry` and returns the new identifier.
    pub fn insert(&mut self, entry: &CalendarEntry, organizer: &str) -> i64 {
        let id = self.next_id;
        self.next_id += 1;

        let mut entry = entry.clone();
        entry.source_id = Some(id);
        self.rows.insert(
            id,
            StoredEntry {
                entry,
                organizer: organizer.to_string(),
                reminders: Vec::new(),
            },
        );
        id
    }

    pub fn delete(&mut self, id: i64) -> StoreResult<()> {
        self.rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::DeleteFailed {
                id,
                reason: "no such entry".to_string(),
            })
    }

    pub fn attach_reminder(&mut self, id: i64, minutes_before: i64) -> StoreResult<()> {
        let row = self
            .rows
            .get_mut(&id)
            .ok_or_else(|| StoreError::ReminderFailed {
                id,
                reason: "no such entry".to_string(),
            })?;
        row.reminders.push(minutes_before);
        Ok(())
    }
}
