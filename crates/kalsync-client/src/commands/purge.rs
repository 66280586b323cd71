//! The purge command.

use std::path::PathBuf;

use chrono::Utc;
use kalsync_sync::{
    CalendarStore, DEFAULT_PROGRESS_CAPACITY, JsonFileStore, ProgressReporter, SyncResult, purge,
};
use tracing::debug;

use crate::cli::PurgeArgs;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::state::SyncState;

/// Removes every synced entry from the configured store.
pub async fn run(config: &ClientConfig, args: &PurgeArgs) -> ClientResult<()> {
    let store_path = args.store.clone().unwrap_or_else(|| config.store_path());
    let state_path = args.state.clone().unwrap_or_else(SyncState::default_path);
    let marker = config.sync_options().marker;

    let result = purge_with(store_path, state_path, marker).await?;
    match (result.summary(), result.error()) {
        (Some(summary), _) => {
            println!("{}", summary);
            Ok(())
        }
        (None, Some(err)) => Err(err.clone().into()),
        (None, None) => Err(ClientError::Task("run ended without a result".to_string())),
    }
}

/// Deletes what earlier runs imported into the store at `store_path` and
/// records the outcome in the state file.
///
/// The known identifiers are forgotten once their entries are gone; after a
/// failed purge the ones still in the store are kept.
pub async fn purge_with(
    store_path: PathBuf,
    state_path: PathBuf,
    marker: String,
) -> ClientResult<SyncResult> {
    let mut store = JsonFileStore::open(&store_path)?;
    let mut state = SyncState::load(&state_path)?;
    debug!(known = state.known_ids.len(), "Loaded sync state");

    let known_ids = state.known_ids.clone();
    let (reporter, mut progress) = ProgressReporter::channel(DEFAULT_PROGRESS_CAPACITY);
    let handle = tokio::task::spawn_blocking(move || {
        let result = purge(&mut store, &known_ids, &marker, &reporter);
        (store, result)
    });
    while let Some(update) = progress.recv().await {
        eprintln!("{}", update);
    }
    let (store, result) = handle.await.map_err(|e| ClientError::Task(e.to_string()))?;

    let still_present: Vec<i64> = store
        .list_existing(&state.known_ids)?
        .into_iter()
        .filter_map(|entry| entry.source_id)
        .collect();
    state.record(&result, still_present, Utc::now());
    state.save(&state_path)?;

    Ok(result)
}
