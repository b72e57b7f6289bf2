//! MyDiet CLI - operator tool for the MyDiet ML gateway.
//!
//! Provides a `mydiet` command that runs the gateway, inspects the metrics
//! store and talks to the trainer service directly.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{MetricsCommand, TrainerArgs, metrics, serve, trainer};

/// MyDiet CLI - ML gateway operations
#[derive(Parser, Debug)]
#[command(
    name = "mydiet",
    author,
    version,
    about = "MyDiet - ML gateway between the diet app and the trainer service"
)]
struct Args {
    /// Log level for one-shot commands (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the ML gateway
    ///
    /// Reads `mydiet.toml` (or `--config`) and `MYDIET_*` environment
    /// variables, then serves until Ctrl+C or SIGTERM.
    Serve {
        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Inspect and record training metrics
    #[command(subcommand)]
    Metrics(MetricsCommand),

    /// Ask the trainer to retrain its model
    Retrain {
        #[command(flatten)]
        trainer: TrainerArgs,
    },

    /// Send a CSV dataset straight to the trainer
    Upload {
        /// CSV file to upload
        file: PathBuf,

        #[command(flatten)]
        trainer: TrainerArgs,
    },
}

fn level_from(name: &str) -> Level {
    match name {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // `serve` installs its own subscriber from the gateway config
    if !matches!(args.command, Command::Serve { .. }) {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level_from(&args.log_level))
            .with_writer(std::io::stderr)
            .without_time()
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    match args.command {
        Command::Serve { config } => serve::execute(config.as_deref()).await,
        Command::Metrics(cmd) => metrics::execute(cmd).await,
        Command::Retrain { trainer } => trainer::retrain(&trainer).await,
        Command::Upload { file, trainer } => trainer::upload(&file, &trainer).await,
    }
}
