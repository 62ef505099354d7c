//! procmeter -- classify, replay and watch game client combat logs.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use colored::Colorize;

use procmeter_core::config::{GeneralConfig, ProcmeterConfig};
use tracing::{debug, info};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Loaded once: logging uses its [general] section, commands get the rest.
    // A broken file only falls back here; the command that needs it reports the error.
    let loaded = commands::load_config(&cli.config).await;
    let general = match &loaded {
        Ok(config) => config.general.clone(),
        Err(_) => GeneralConfig::default(),
    };
    if let Err(e) = logging::init_tracing(&general, cli.log_level.as_deref()) {
        eprintln!("{} {e}", "error:".red().bold());
        std::process::exit(CliError::Config(e.to_string()).exit_code());
    }
    match &loaded {
        Ok(_) => info!(path = %cli.config.display(), "configuration loaded"),
        Err(e) => debug!(error = %e, "configuration unavailable, logging uses defaults"),
    }

    if let Err(e) = run(cli, loaded).await {
        eprintln!("{} {e}", "error:".red().bold());
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, loaded: Result<ProcmeterConfig, CliError>) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    let config_path = cli.config;

    match cli.command {
        Commands::Classify(args) => commands::classify::execute(args, &loaded?, &writer).await,
        Commands::Replay(args) => commands::replay::execute(args, &loaded?, &writer).await,
        Commands::Watch(args) => commands::watch::execute(args, &loaded?, &writer).await,
        Commands::Rules(args) => commands::rules::execute(args, loaded, &writer).await,
        Commands::Config(args) => {
            commands::config::execute(args, &config_path, loaded, &writer).await
        }
    }
}
