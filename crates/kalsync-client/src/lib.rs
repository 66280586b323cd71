//! kalsync command-line client.
//!
//! This crate provides the `kalsync` binary: settings loading and migration,
//! persisted sync state and the subcommands that drive the sync pipeline.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;
pub mod state;

pub use cli::Cli;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use state::SyncState;
