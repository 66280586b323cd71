//! Calendar store persisted as a JSON file.
//!
//! The whole table is rewritten after every mutation, so whatever a failed
//! run managed to insert is still on disk afterwards.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use kalsync_core::CalendarEntry;
use tracing::{debug, trace};

use crate::error::StoreResult;
use crate::store::{CalendarStore, EntryTable, StoredEntry};

/// A [`CalendarStore`] backed by a JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    table: EntryTable,
}

impl JsonFileStore {
    /// Opens the store at `path`; a missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let table = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => EntryTable::default(),
            Err(err) => return Err(err.into()),
        };

        debug!(path = %path.display(), entries = table.len(), "Opened calendar store");
        Ok(Self { path, table })
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored row for `id`.
    pub fn get(&self, id: i64) -> Option<&StoredEntry> {
        self.table.get(id)
    }

    /// Returns the rows as loaded or last written.
    pub fn table(&self) -> &EntryTable {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Writes the table to a sibling temp file, then renames it into place.
    fn save(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.table)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        trace!(path = %self.path.display(), "Saved calendar store");
        Ok(())
    }
}

impl CalendarStore for JsonFileStore {
    fn list_existing(&self, known_ids: &BTreeSet<i64>) -> StoreResult<Vec<CalendarEntry>> {
        Ok(self.table.list_existing(known_ids))
    }

    fn list_by_marker(&self, marker: &str) -> StoreResult<Vec<CalendarEntry>> {
        Ok(self.table.list_by_marker(marker))
    }

    fn insert(&mut self, entry: &CalendarEntry, marker: &str) -> StoreResult<i64> {
        let id = self.table.insert(entry, marker);
        self.save()?;
        Ok(id)
    }

    fn delete(&mut self, id: i64) -> StoreResult<()> {
        self.table.delete(id)?;
        self.save()
    }

    fn attach_reminder(&mut self, id: i64, minutes_before: i64) -> StoreResult<()> {
        self.table.attach_reminder(id, minutes_before)?;
        self.save()
    }
}
