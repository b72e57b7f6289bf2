//! `mydiet serve`

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use mydiet_core::{config::Config, server, telemetry};

/// Load configuration and run the gateway until shutdown.
pub async fn execute(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    telemetry::init(config.logging.format).context("Failed to initialise logging")?;

    println!(
        "{} on {} (trainer: {})",
        "Starting ML gateway".bold().cyan(),
        config.server.address.to_string().green(),
        config.trainer.base_url()?.green()
    );

    server::run(&config).await?;
    Ok(())
}
