//! The fetch, parse and reconcile pipeline.

use std::collections::BTreeSet;

use kalsync_feed::{FeedSource, ics};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::engine::{SyncOptions, importable, reconcile};
use crate::progress::{DEFAULT_PROGRESS_CAPACITY, ProgressReporter, SyncProgress};
use crate::result::SyncResult;
use crate::store::{CalendarStore, load_snapshot};

/// Runs one feed against a calendar store.
#[derive(Debug)]
pub struct SyncRunner<F> {
    source: F,
    options: SyncOptions,
}

impl<F: FeedSource> SyncRunner<F> {
    pub fn new(source: F, options: SyncOptions) -> Self {
        Self { source, options }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Runs once without progress reporting.
    pub async fn run<S: CalendarStore + ?Sized>(
        &self,
        store: &mut S,
        known_ids: &BTreeSet<i64>,
    ) -> SyncResult {
        self.run_with_progress(store, known_ids, &ProgressReporter::disabled())
            .await
    }

    /// Runs once, reporting progress to `progress`.
    ///
    /// Every failure is returned inside the [`SyncResult`]; nothing is
    /// retried here.
    pub async fn run_with_progress<S: CalendarStore + ?Sized>(
        &self,
        store: &mut S,
        known_ids: &BTreeSet<i64>,
        progress: &ProgressReporter,
    ) -> SyncResult {
        info!(feed = self.source.name(), "Starting sync");
        progress.report("downloading feed", 0, 0);

        let body = match self.source.fetch().await {
            Ok(body) => body,
            Err(err) => {
                error!(feed = self.source.name(), error = %err, "Could not fetch feed");
                return SyncResult::failure(err, Vec::new(), 0);
            }
        };

        let parsed = match ics::parse(&body) {
            Ok(entries) => entries,
            Err(err) => {
                error!(error = %err, "Could not parse feed");
                return SyncResult::failure(err, Vec::new(), 0);
            }
        };
        let (feed, ignored) = importable(parsed);
        debug!(entries = feed.len(), ignored, "Parsed feed");

        let existing = match load_snapshot(store, known_ids, &self.options.marker) {
            Ok(crowd) => crowd,
            Err(err) => {
                error!(error = %err, "Could not load existing entries");
                return SyncResult::failure(err, Vec::new(), 0);
            }
        };

        let result = reconcile(store, feed, existing, &self.options, progress);
        if let Some(err) = result.error() {
            error!(error = %err, added = result.added_count(), "Sync stopped early");
        }
        result
    }
}

impl<F: FeedSource + 'static> SyncRunner<F> {
    /// Moves one run onto a tokio task.
    ///
    /// The store is handed back together with the result. Aborting the
    /// handle cancels the whole run; entries already written stay written.
    pub fn spawn<S: CalendarStore + 'static>(
        self,
        store: S,
        known_ids: BTreeSet<i64>,
    ) -> (JoinHandle<(S, SyncResult)>, mpsc::Receiver<SyncProgress>) {
        let (reporter, rx) = ProgressReporter::channel(DEFAULT_PROGRESS_CAPACITY);
        let handle = tokio::spawn(async move {
            let mut store = store;
            let result = self
                .run_with_progress(&mut store, &known_ids, &reporter)
                .await;
            (store, result)
        });
        (handle, rx)
    }
}
