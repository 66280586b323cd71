//! kalsync CLI entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use kalsync_client::cli::{Cli, Command, ConfigAction};
use kalsync_client::commands;
use kalsync_client::config::ClientConfig;
use kalsync_client::error::ClientResult;
use kalsync_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config is read before logging is set up so its `debug` flag applies
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = load_config(cli.config.is_some(), &config_path);

    let debug = cli.debug || config.as_ref().is_ok_and(|c| c.debug);
    let tracing = if cli.json_logs {
        TracingConfig::unattended()
    } else {
        TracingConfig::for_cli(debug)
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("warning: could not set up logging: {}", e);
    }

    match run(cli.command, config_path, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(explicit: bool, path: &Path) -> ClientResult<ClientConfig> {
    if explicit {
        ClientConfig::load_from(path)
    } else {
        ClientConfig::load()
    }
}

async fn run(
    command: Command,
    config_path: PathBuf,
    config: ClientResult<ClientConfig>,
) -> ClientResult<()> {
    // Migration works on the raw file, so it must not depend on a successful load
    if let Command::Config {
        action: ConfigAction::Migrate,
    } = command
    {
        return commands::config::migrate(&config_path);
    }
    let config = config?;

    match command {
        Command::Sync(args) => commands::sync::run(&config, &args).await,
        Command::Purge(args) => commands::purge::run(&config, &args).await,
        Command::Parse {
            file,
            importable_only,
        } => commands::parse::run(&file, importable_only),
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
            ConfigAction::Migrate => commands::config::migrate(&config_path),
        },
    }
}
