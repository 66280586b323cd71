//! Local feed parsing command.

use std::path::Path;

use kalsync_core::CalendarEntry;
use kalsync_feed::ics;
use kalsync_sync::importable;

use crate::error::{ClientError, ClientResult};

/// Parses `file` and returns its entries.
pub fn entries(file: &Path, importable_only: bool) -> ClientResult<Vec<CalendarEntry>> {
    let body = std::fs::read_to_string(file)?;
    let entries = ics::parse(&body).map_err(kalsync_feed::FeedError::from)?;
    if importable_only {
        Ok(importable(entries).0)
    } else {
        Ok(entries)
    }
}

/// Prints the entries of `file` as pretty JSON.
pub fn run(file: &Path, importable_only: bool) -> ClientResult<()> {
    let entries = entries(file, importable_only)?;
    let json = serde_json::to_string_pretty(&entries)
        .map_err(|e| ClientError::Config(format!("failed to serialize entries: {}", e)))?;
    println!("{}", json);
    Ok(())
}
