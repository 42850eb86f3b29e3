//! drivelink CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use drivelink_client::cli::{Cli, Command, ConfigAction};
use drivelink_client::commands;
use drivelink_client::config::ClientConfig;
use drivelink_client::error::{ClientError, ClientResult};
use drivelink_core::{TracingConfig, TracingOutputFormat, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut tracing_config = TracingConfig::for_cli(cli.debug);
    if cli.log_json {
        tracing_config = tracing_config.with_format(TracingOutputFormat::Json);
    }
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: failed to initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let mut config = if cli.config.is_some() {
        ClientConfig::load_from(&path).map_err(ClientError::Config)?
    } else {
        ClientConfig::load().map_err(ClientError::Config)?
    };
    cli.apply_overrides(&mut config);
    tracing::debug!(config = %path.display(), backend = %config.backend.base_url, "configuration loaded");

    match cli.command {
        #[cfg(feature = "google")]
        Command::Connect { no_open } => commands::connect::run(&config, no_open).await,
        Command::Status => commands::status::run(&config).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&path),
        },
    }
}
