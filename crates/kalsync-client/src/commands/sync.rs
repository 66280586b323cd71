//! The sync command.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::Utc;
use kalsync_feed::{FeedClient, FeedSource};
use kalsync_sync::{
    CalendarStore, JsonFileStore, MemoryStore, SyncOptions, SyncResult, SyncRunner,
};
use tracing::{debug, info};

use crate::cli::SyncArgs;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::state::SyncState;

/// Runs one sync with the configured feed.
pub async fn run(config: &ClientConfig, args: &SyncArgs) -> ClientResult<()> {
    if skip_scheduled(config, args) {
        info!("Scheduled syncing is disabled in the configuration");
        println!("Scheduled syncing is disabled (sync_disabled = true), nothing to do.");
        return Ok(());
    }

    let feed = FeedClient::new(config.feed_config()?)?;
    let options = config
        .sync_options()
        .with_replace_existing(args.replace_existing(config.sync.replace_existing));
    let store_path = args.store.clone().unwrap_or_else(|| config.store_path());
    let state_path = args.state.clone().unwrap_or_else(SyncState::default_path);

    let result = sync_with(feed, options, store_path, state_path, args.dry_run).await?;
    match result.summary() {
        Some(summary) => {
            println!("{}", summary);
            Ok(())
        }
        None => Err(result
            .error()
            .cloned()
            .map(ClientError::from)
            .unwrap_or_else(|| ClientError::Task("run ended without a result".to_string()))),
    }
}

/// Returns true for a `--scheduled` run while `[sync] sync_disabled` is set.
///
/// Runs started by hand always go ahead.
pub fn skip_scheduled(config: &ClientConfig, args: &SyncArgs) -> bool {
    args.scheduled && config.sync.sync_disabled
}

/// Runs `source` against the store at `store_path` and updates the state file.
///
/// A dry run reconciles against an in-memory copy of the store, with the
/// known identifiers from the state file, and leaves both files untouched.
pub async fn sync_with<F: FeedSource + 'static>(
    source: F,
    options: SyncOptions,
    store_path: PathBuf,
    state_path: PathBuf,
    dry_run: bool,
) -> ClientResult<SyncResult> {
    let store = JsonFileStore::open(&store_path)?;
    let runner = SyncRunner::new(source, options);
    let mut state = SyncState::load(&state_path)?;
    debug!(known = state.known_ids.len(), "Loaded sync state");

    if dry_run {
        let copy = MemoryStore::from_table(store.table().clone());
        info!(entries = copy.len(), "Dry run against a copy of the store");
        let (_, result) = drive(runner, copy, state.known_ids.clone()).await?;
        return Ok(result);
    }

    let (store, result) = drive(runner, store, state.known_ids.clone()).await?;

    let mut candidates = state.known_ids.clone();
    candidates.extend(result.added_ids().iter().copied());
    let still_present: Vec<i64> = store
        .list_existing(&candidates)?
        .into_iter()
        .filter_map(|entry| entry.source_id)
        .collect();
    state.record(&result, still_present, Utc::now());
    state.save(&state_path)?;

    Ok(result)
}

async fn drive<F, S>(
    runner: SyncRunner<F>,
    store: S,
    known_ids: BTreeSet<i64>,
) -> ClientResult<(S, SyncResult)>
where
    F: FeedSource + 'static,
    S: CalendarStore + 'static,
{
    let (handle, mut progress) = runner.spawn(store, known_ids);
    while let Some(update) = progress.recv().await {
        eprintln!("{}", update);
    }
    handle.await.map_err(|e| ClientError::Task(e.to_string()))
}
