//! Client error types.

use std::fmt;

use kalsync_feed::{ConfigError, FeedError};
use kalsync_sync::{StoreError, SyncError};

use crate::config::MigrationError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// The settings file could not be brought to the current schema.
    Migration(MigrationError),
    /// Feed download or parsing failed.
    Feed(FeedError),
    /// Local calendar store error.
    Store(StoreError),
    /// A sync run ended with an error.
    Sync(SyncError),
    /// The background sync task panicked or was cancelled.
    Task(String),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Migration(err) => write!(f, "configuration migration failed: {}", err),
            Self::Feed(err) => write!(f, "feed error: {}", err),
            Self::Store(err) => write!(f, "store error: {}", err),
            Self::Sync(err) => write!(f, "sync failed: {}", err),
            Self::Task(msg) => write!(f, "sync task failed: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Migration(err) => Some(err),
            Self::Feed(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Sync(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Config(_) | Self::Task(_) => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<MigrationError> for ClientError {
    fn from(err: MigrationError) -> Self {
        Self::Migration(err)
    }
}

impl From<FeedError> for ClientError {
    fn from(err: FeedError) -> Self {
        Self::Feed(err)
    }
}

impl From<ConfigError> for ClientError {
    fn from(err: ConfigError) -> Self {
        Self::Feed(err.into())
    }
}

impl From<StoreError> for ClientError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<SyncError> for ClientError {
    fn from(err: SyncError) -> Self {
        Self::Sync(err)
    }
}
