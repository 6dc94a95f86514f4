mod cli;
mod commands;
mod config;
mod context;
mod effects;
mod logging;

use clap::Parser;
use log::LevelFilter;

use chronicle_logging::{chronicle_debug, chronicle_warn};

use crate::cli::Cli;
use crate::config::AppConfig;
use crate::context::AppContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, warning) = AppConfig::load_or_default(&cli.config);

    let level = if cli.quiet {
        LevelFilter::Warn
    } else {
        chronicle_logging::parse_level(&config.logging.level)
    };
    logging::initialize(config.logging.destination, level, &config.logging.file);
    if let Some(warning) = warning {
        chronicle_warn!("{}", warning);
    }
    chronicle_debug!("Using configuration from {}", cli.config.display());

    let mut ctx = AppContext::open(config)?;
    commands::run(cli.command, &mut ctx).await
}
