//! Reconciliation engine, calendar stores and the sync pipeline.
//!
//! A run fetches the feed, parses it, drops declined and canceled entries,
//! loads the entries earlier runs created into a [`Crowd`] and then inserts
//! whatever the crowd does not already hold:
//!
//! ```text
//! FeedSource ─► ics::parse ─► importable ─► reconcile ─► CalendarStore
//!                                              ▲
//!                     load_snapshot ───► Crowd ┘
//! ```

pub mod crowd;
pub mod engine;
pub mod error;
pub mod file_store;
pub mod memory;
pub mod progress;
pub mod reminder;
pub mod result;
pub mod runner;
pub mod store;

pub use crowd::{Crowd, Placement};
pub use engine::{SyncOptions, importable, purge, reconcile};
pub use error::{StoreError, StoreResult, SyncError};
pub use file_store::JsonFileStore;
pub use memory::{CallCounts, MemoryStore};
pub use progress::{DEFAULT_PROGRESS_CAPACITY, ProgressReporter, SyncProgress};
pub use reminder::ReminderPolicy;
pub use result::SyncResult;
pub use runner::SyncRunner;
pub use store::{CalendarStore, EntryTable, ORGANIZER_MARKER, StoredEntry, load_snapshot};
