//! Sync state kept between runs.
//!
//! `state.json` in the data directory remembers which store identifiers
//! earlier runs created, so the next run can find them even if their
//! organizer was changed.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use kalsync_sync::SyncResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Persistent sync state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncState {
    /// Store identifiers created by earlier runs.
    pub known_ids: BTreeSet<i64>,

    /// When the last run finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,

    /// Summary or error of the last run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<String>,
}

impl SyncState {
    /// Returns the default state file path.
    pub fn default_path() -> PathBuf {
        ClientConfig::default_data_dir().join("state.json")
    }

    /// Loads the state; a missing file is an empty state.
    pub fn load(path: &Path) -> ClientResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                crate::error::ClientError::Config(format!(
                    "failed to parse {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes the state next to `path` and renames it into place.
    pub fn save(&self, path: &Path) -> ClientResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), ids = self.known_ids.len(), "Saved sync state");
        Ok(())
    }

    /// Records a finished run.
    ///
    /// `still_present` are the known identifiers the store still holds; ids
    /// that disappeared (deleted in replace mode or by hand) are forgotten.
    pub fn record(
        &mut self,
        result: &SyncResult,
        still_present: impl IntoIterator<Item = i64>,
        at: DateTime<Utc>,
    ) {
        self.known_ids = still_present.into_iter().collect();
        self.known_ids.extend(result.added_ids().iter().copied());
        self.last_run = Some(at);
        self.last_outcome = match (result.summary(), result.error()) {
            (Some(summary), _) => Some(summary.to_string()),
            (None, Some(err)) => Some(format!("failed: {}", err)),
            (None, None) => None,
        };
    }
}
