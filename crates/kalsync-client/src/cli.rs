//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// kalsync - Import a protected ICS feed into a local calendar
#[derive(Debug, Parser)]
#[command(name = "kalsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "KALSYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log as JSON lines (for scheduled runs)
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download the feed and import new entries
    Sync(SyncArgs),

    /// Delete every entry earlier runs imported
    Purge(PurgeArgs),

    /// Parse a local ICS file and print the entries as JSON
    Parse {
        /// ICS file to read
        file: PathBuf,

        /// Leave out declined and canceled entries
        #[arg(long)]
        importable_only: bool,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options for a sync run.
#[derive(Debug, Default, Args)]
pub struct SyncArgs {
    /// Delete previously synced entries first
    #[arg(long, conflicts_with = "keep_existing")]
    pub replace: bool,

    /// Never delete previously synced entries
    #[arg(long)]
    pub keep_existing: bool,

    /// Reconcile against a copy of the store and discard the result
    #[arg(long)]
    pub dry_run: bool,

    /// Started by a scheduler; does nothing while `sync_disabled` is set
    #[arg(long)]
    pub scheduled: bool,

    /// Calendar store file
    #[arg(long, env = "KALSYNC_STORE")]
    pub store: Option<PathBuf>,

    /// Sync state file
    #[arg(long)]
    pub state: Option<PathBuf>,
}

impl SyncArgs {
    /// Returns the replace mode, falling back to `configured`.
    pub fn replace_existing(&self, configured: bool) -> bool {
        if self.replace {
            true
        } else if self.keep_existing {
            false
        } else {
            configured
        }
    }
}

/// Options for removing synced entries.
#[derive(Debug, Default, Args)]
pub struct PurgeArgs {
    /// Calendar store file
    #[arg(long, env = "KALSYNC_STORE")]
    pub store: Option<PathBuf>,

    /// Sync state file
    #[arg(long)]
    pub state: Option<PathBuf>,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,

    /// Rewrite the configuration file at the current schema version
    Migrate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sync_flags() {
        let cli = Cli::try_parse_from(["kalsync", "-v", "sync", "--replace", "--dry-run"]).unwrap();
        assert!(cli.debug);
        match cli.command {
            Command::Sync(args) => {
                assert!(args.dry_run);
                assert!(args.replace_existing(false));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn replace_flags_conflict() {
        assert!(Cli::try_parse_from(["kalsync", "sync", "--replace", "--keep-existing"]).is_err());
    }

    #[test]
    fn replace_mode_falls_back_to_config() {
        let args = SyncArgs::default();
        assert!(args.replace_existing(true));
        assert!(!args.replace_existing(false));

        let args = SyncArgs {
            keep_existing: true,
            ..Default::default()
        };
        assert!(!args.replace_existing(true));
    }

    #[test]
    fn parses_purge_and_scheduled_sync() {
        let cli = Cli::try_parse_from(["kalsync", "purge", "--store", "/tmp/c.json"]).unwrap();
        match cli.command {
            Command::Purge(args) => assert_eq!(args.store, Some(PathBuf::from("/tmp/c.json"))),
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["kalsync", "sync", "--scheduled"]).unwrap();
        assert!(matches!(cli.command, Command::Sync(SyncArgs { scheduled: true, .. })));
    }

    #[test]
    fn parses_config_migrate() {
        let cli = Cli::try_parse_from(["kalsync", "config", "migrate", "--config", "/tmp/k.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/k.toml")));
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Migrate
            }
        ));
    }
}
