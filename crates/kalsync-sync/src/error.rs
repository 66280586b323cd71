//! Error types for the calendar store and the sync pipeline.

use kalsync_feed::{FeedError, ParseError};
use thiserror::Error;

/// A failure reported by a calendar store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An entry could not be written.
    #[error("could not insert {entry}: {reason}")]
    InsertFailed { entry: String, reason: String },

    /// An entry could not be removed.
    #[error("could not delete entry {id}: {reason}")]
    DeleteFailed { id: i64, reason: String },

    /// Existing entries could not be listed.
    #[error("could not query the calendar store: {0}")]
    QueryFailed(String),

    /// A reminder could not be attached to an entry.
    #[error("could not attach a reminder to entry {id}: {reason}")]
    ReminderFailed { id: i64, reason: String },

    /// Reading or writing the backing file failed.
    #[error("calendar store i/o failed: {0}")]
    Io(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// A failure that ended a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Fetching or parsing the feed failed.
    #[error("feed: {0}")]
    Feed(#[from] FeedError),

    /// The calendar store failed.
    #[error("calendar store: {0}")]
    Store(#[from] StoreError),
}

impl From<ParseError> for SyncError {
    fn from(err: ParseError) -> Self {
        Self::Feed(err.into())
    }
}

impl SyncError {
    /// Returns true if running again later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Feed(err) => err.is_retryable(),
            Self::Store(StoreError::Io(_)) => true,
            Self::Store(_) => false,
        }
    }
}

/// A specialized Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
