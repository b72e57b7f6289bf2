//! MyDiet ML gateway - entry point.
//!
//! Usage: `mydiet-server [CONFIG_PATH]`

use std::path::PathBuf;

use tracing::error;

use mydiet_core::{config::Config, server, telemetry};

#[tokio::main]
async fn main() {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);

    let config = match Config::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            // No subscriber yet; the format comes from the config
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = telemetry::init(config.logging.format) {
        eprintln!("Failed to initialise logging: {e}");
    }

    if let Err(e) = server::run(&config).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
