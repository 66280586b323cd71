//! Configuration commands.

use std::path::Path;

use crate::config::{CURRENT_VERSION, ClientConfig};
use crate::error::ClientResult;
use crate::secret;

/// Dump the current configuration to stdout, hiding a literal password.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let mut shown = config.clone();
    if !shown.feed.password.is_empty() && !secret::is_reference(&shown.feed.password) {
        shown.feed.password = "********".to_string();
    }
    println!("# config.toml ({})", path.display());
    println!("{}", shown.to_toml_string()?);
    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.validate()?;
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}

/// Rewrite the configuration file at the current schema version.
pub fn migrate(path: &Path) -> ClientResult<()> {
    if !path.exists() {
        println!("No configuration file at {}.", path.display());
        return Ok(());
    }
    match ClientConfig::migrate_file(path)? {
        Some(from) => println!(
            "Migrated {} from version {} to {}.",
            path.display(),
            from,
            CURRENT_VERSION
        ),
        None => println!("{} is already at version {}.", path.display(), CURRENT_VERSION),
    }
    Ok(())
}
