//! In-process calendar store.
//!
//! Used for dry runs and as the reference store in tests. It counts every
//! call so tests can assert how the engine used it, and it can be told to
//! fail inserts or reminders.

use std::collections::BTreeSet;

use kalsync_core::CalendarEntry;

use crate::error::{StoreError, StoreResult};
use crate::store::{CalendarStore, EntryTable, StoredEntry};

/// Number of calls made to each store operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list_existing: usize,
    pub list_by_marker: usize,
    pub insert: usize,
    pub delete: usize,
    pub attach_reminder: usize,
}

/// A [`CalendarStore`] kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: EntryTable,
    calls: std::cell::Cell<CallCounts>,
    fail_insert_after: Option<usize>,
    fail_reminders: bool,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding a copy of `table`, identifiers included.
    pub fn from_table(table: EntryTable) -> Self {
        Self {
            table,
            ..Self::default()
        }
    }

    /// Adds an entry directly, bypassing call counting.
    pub fn seed(&mut self, entry: CalendarEntry, organizer: &str) -> i64 {
        self.table.insert(&entry, organizer)
    }

    /// Makes every insert after the first `successes` fail.
    pub fn fail_inserts_after(mut self, successes: usize) -> Self {
        self.fail_insert_after = Some(successes);
        self
    }

    /// Makes every reminder attachment fail.
    pub fn fail_reminders(mut self) -> Self {
        self.fail_reminders = true;
        self
    }

    /// Returns the call counters.
    pub fn calls(&self) -> CallCounts {
        self.calls.get()
    }

    /// Returns the stored row for `id`.
    pub fn get(&self, id: i64) -> Option<&StoredEntry> {
        self.table.get(id)
    }

    /// Returns all stored entries in start order.
    pub fn entries(&self) -> Vec<CalendarEntry> {
        let mut entries: Vec<CalendarEntry> =
            self.table.iter().map(|(_, row)| row.entry.clone()).collect();
        entries.sort_by_key(|e| e.start_millis);
        entries
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn count(&self, bump: impl FnOnce(&mut CallCounts)) {
        let mut calls = self.calls.get();
        bump(&mut calls);
        self.calls.set(calls);
    }
}

impl CalendarStore for MemoryStore {
    fn list_existing(&self, known_ids: &BTreeSet<i64>) -> StoreResult<Vec<CalendarEntry>> {
        self.count(|c| c.list_existing += 1);
        Ok(self.table.list_existing(known_ids))
    }

    fn list_by_marker(&self, marker: &str) -> StoreResult<Vec<CalendarEntry>> {
        self.count(|c| c.list_by_marker += 1);
        Ok(self.table.list_by_marker(marker))
    }

    fn insert(&mut self, entry: &CalendarEntry, marker: &str) -> StoreResult<i64> {
        self.count(|c| c.insert += 1);
        if self
            .fail_insert_after
            .is_some_and(|limit| self.calls.get().insert > limit)
        {
            return Err(StoreError::InsertFailed {
                entry: entry.label(),
                reason: "store rejected the entry".to_string(),
            });
        }
        Ok(self.table.insert(entry, marker))
    }

    fn delete(&mut self, id: i64) -> StoreResult<()> {
        self.count(|c| c.delete += 1);
        self.table.delete(id)
    }

    fn attach_reminder(&mut self, id: i64, minutes_before: i64) -> StoreResult<()> {
        self.count(|c| c.attach_reminder += 1);
        if self.fail_reminders {
            return Err(StoreError::ReminderFailed {
                id,
                reason: "reminders are not supported".to_string(),
            });
        }
        self.table.attach_reminder(id, minutes_before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ORGANIZER_MARKER;

    #[test]
    fn counts_calls() {
        let mut store = MemoryStore::new();
        let id = store
            .insert(&CalendarEntry::new("a", 0, 10), ORGANIZER_MARKER)
            .unwrap();
        store.attach_reminder(id, 1440).unwrap();
        store.list_by_marker(ORGANIZER_MARKER).unwrap();
        store.delete(id).unwrap();

        let calls = store.calls();
        assert_eq!(calls.insert, 1);
        assert_eq!(calls.attach_reminder, 1);
        assert_eq!(calls.list_by_marker, 1);
        assert_eq!(calls.delete, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn seeding_is_not_counted() {
        let mut store = MemoryStore::new();
        store.seed(CalendarEntry::new("a", 0, 10), "someone@example.com");
        assert_eq!(store.calls(), CallCounts::default());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn copy_keeps_identifiers() {
        let mut table = EntryTable::default();
        table.insert(&CalendarEntry::new("a", 0, 10), "someone@example.com");
        let id = table.insert(&CalendarEntry::new("b", 20, 30), ORGANIZER_MARKER);

        let mut store = MemoryStore::from_table(table);
        assert!(store.get(id).is_some());

        let next = store
            .insert(&CalendarEntry::new("c", 40, 50), ORGANIZER_MARKER)
            .unwrap();
        assert_eq!(next, id + 1);
        assert_eq!(store.calls().insert, 1);
    }

    #[test]
    fn injected_insert_failure() {
        let mut store = MemoryStore::new().fail_inserts_after(1);
        assert!(store.insert(&CalendarEntry::new("a", 0, 10), ORGANIZER_MARKER).is_ok());

        let err = store
            .insert(&CalendarEntry::new("b", 0, 10), ORGANIZER_MARKER)
            .unwrap_err();
        assert!(matches!(err, StoreError::InsertFailed { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn injected_reminder_failure() {
        let mut store = MemoryStore::new().fail_reminders();
        let id = store
            .insert(&CalendarEntry::new("a", 0, 10), ORGANIZER_MARKER)
            .unwrap();
        assert!(store.attach_reminder(id, 60).is_err());
        assert!(store.get(id).unwrap().reminders.is_empty());
    }
}
