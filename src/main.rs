//! Logsleuth CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;

use logsleuth::cli::{commands, Cli, Commands};
use logsleuth::domain::models::Config;
use logsleuth::{ConfigLoader, LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        logsleuth::cli::handle_error(err, json);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let _logger = LoggerImpl::init(&LogConfig::from_settings(&config.logging)?)
        .context("Failed to initialize logging")?;

    match cli.command {
        Commands::Investigate(args) => commands::investigate::execute(args, &config, cli.json).await,
        Commands::Correlate(args) => commands::correlate::execute(args, &config, cli.json).await,
        Commands::Patterns(args) => commands::patterns::execute(args, &config, cli.json),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => ConfigLoader::load().context("Failed to load configuration"),
    }
}
