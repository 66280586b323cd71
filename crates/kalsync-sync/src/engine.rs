//! Reconciliation of parsed feed entries against the local snapshot.
//!
//! Each feed entry is located in the [`Crowd`] and then skipped as a
//! duplicate or inserted into the store. Inserted entries are added to the
//! crowd too, so later entries of the same batch are checked against them.

use std::collections::BTreeSet;

use kalsync_core::CalendarEntry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::crowd::{Crowd, Placement};
use crate::error::{StoreError, StoreResult};
use crate::progress::ProgressReporter;
use crate::reminder::ReminderPolicy;
use crate::result::SyncResult;
use crate::store::{CalendarStore, ORGANIZER_MARKER, load_snapshot};

/// Settings for one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Delete every previously synced entry before inserting the feed.
    pub replace_existing: bool,
    /// Reminders attached to inserted entries.
    pub reminders: ReminderPolicy,
    /// Organizer written into inserted entries and used to find them again.
    pub marker: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            replace_existing: false,
            reminders: ReminderPolicy::default(),
            marker: ORGANIZER_MARKER.to_string(),
        }
    }
}

impl SyncOptions {
    /// Builder method to enable replace mode.
    pub fn with_replace_existing(mut self, replace: bool) -> Self {
        self.replace_existing = replace;
        self
    }

    /// Builder method to set the reminder policy.
    pub fn with_reminders(mut self, reminders: ReminderPolicy) -> Self {
        self.reminders = reminders;
        self
    }

    /// Builder method to set the organizer marker.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }
}

/// Drops declined and canceled entries; returns the rest and how many were dropped.
pub fn importable(entries: Vec<CalendarEntry>) -> (Vec<CalendarEntry>, usize) {
    let before = entries.len();
    let kept: Vec<CalendarEntry> = entries
        .into_iter()
        .filter(|e| e.entry_state.is_importable())
        .collect();
    let dropped = before - kept.len();
    if dropped > 0 {
        debug!(dropped, "Ignoring declined and canceled entries");
    }
    (kept, dropped)
}

/// Reconciles `feed` against `existing` and writes the difference to `store`.
///
/// In replace mode every entry of `existing` that carries a store identifier
/// is deleted first and the feed is inserted without any lookup. Otherwise
/// each feed entry is looked up in the crowd; once the crowd turns out to be
/// empty, lookups are switched off for the rest of the batch.
///
/// The first failing insert, delete or reminder attachment ends the run.
/// Work done up to that point stays in the store and is reported in the
/// failed result. An entry whose reminder failed was already written, so it
/// counts as added.
pub fn reconcile<S: CalendarStore + ?Sized>(
    store: &mut S,
    feed: Vec<CalendarEntry>,
    existing: Crowd,
    options: &SyncOptions,
    progress: &ProgressReporter,
) -> SyncResult {
    let mut crowd = existing;
    let mut added_ids = Vec::with_capacity(feed.len());
    let mut skipped = 0;
    let mut checking = !options.replace_existing;

    let deleted = if options.replace_existing {
        match delete_all(store, &crowd, progress) {
            Ok(count) => {
                info!(deleted = count, "Removed previously synced entries");
                count
            }
            Err((err, count)) => return SyncResult::failure(err, added_ids, count),
        }
    } else {
        0
    };

    let total = feed.len();
    for (i, entry) in feed.into_iter().enumerate() {
        let slot = if checking {
            match crowd.locate(&entry) {
                Placement::Duplicate(_) => {
                    debug!(entry = %entry.label(), "Already synced, skipping");
                    skipped += 1;
                    progress.report("importing entries", i + 1, total);
                    continue;
                }
                Placement::NoReference => {
                    info!("No previously synced entries, importing without checks");
                    checking = false;
                    None
                }
                Placement::Insert(idx) => Some(idx),
            }
        } else {
            None
        };

        let id = match store.insert(&entry, &options.marker) {
            Ok(id) => id,
            Err(err) => {
                let err = match err {
                    StoreError::InsertFailed { .. } => err,
                    other => StoreError::InsertFailed {
                        entry: entry.label(),
                        reason: other.to_string(),
                    },
                };
                return SyncResult::failure(err, added_ids, deleted);
            }
        };
        debug!(id, entry = %entry.label(), "Inserted entry");

        added_ids.push(id);
        if let Err(err) = attach_reminders(store, id, &entry, &options.reminders) {
            return SyncResult::failure(err, added_ids, deleted);
        }

        if let Some(idx) = slot {
            crowd.insert_at(idx, entry.with_source_id(id));
        }
        progress.report("importing entries", i + 1, total);
    }

    let result = SyncResult::success(added_ids, skipped, deleted);
    if let Some(summary) = result.summary() {
        info!("{}", summary);
    }
    result
}

/// Deletes every entry earlier runs created.
///
/// The entries are found the same way a sync run finds them: by the known
/// identifiers and by `marker`. The first failing delete ends the run; the
/// entries removed until then are reported in the failed result.
pub fn purge<S: CalendarStore + ?Sized>(
    store: &mut S,
    known_ids: &BTreeSet<i64>,
    marker: &str,
    progress: &ProgressReporter,
) -> SyncResult {
    let crowd = match load_snapshot(store, known_ids, marker) {
        Ok(crowd) => crowd,
        Err(err) => return SyncResult::failure(err, Vec::new(), 0),
    };

    match delete_all(store, &crowd, progress) {
        Ok(deleted) => {
            let result = SyncResult::purged(deleted);
            info!(deleted, "Removed synced entries");
            result
        }
        Err((err, deleted)) => SyncResult::failure(err, Vec::new(), deleted),
    }
}

/// Deletes the crowd's stored entries; on failure returns the error and how
/// many were removed before it.
fn delete_all<S: CalendarStore + ?Sized>(
    store: &mut S,
    crowd: &Crowd,
    progress: &ProgressReporter,
) -> Result<usize, (StoreError, usize)> {
    let doomed: Vec<i64> = crowd.entries().iter().filter_map(|e| e.source_id).collect();
    let total = doomed.len();
    for (i, id) in doomed.into_iter().enumerate() {
        store.delete(id).map_err(|err| (err, i))?;
        progress.report("removing previously synced entries", i + 1, total);
    }
    Ok(total)
}

fn attach_reminders<S: CalendarStore + ?Sized>(
    store: &mut S,
    id: i64,
    entry: &CalendarEntry,
    policy: &ReminderPolicy,
) -> StoreResult<()> {
    for minutes in policy.minutes_for(entry.entry_state) {
        store.attach_reminder(id, minutes).map_err(|err| {
            warn!(id, minutes, error = %err, "Could not attach reminder");
            let reason = match err {
                StoreError::ReminderFailed { reason, .. } => reason,
                other => other.to_string(),
            };
            StoreError::ReminderFailed {
                id,
                reason: format!("{}: {}", entry.label(), reason),
            }
        })?;
    }
    Ok(())
}
