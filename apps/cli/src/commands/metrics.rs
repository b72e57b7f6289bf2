//! `mydiet metrics`: read and write the metrics store without the server.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::Colorize;
use mydiet_core::{Database, MetricsStore, SqliteMetricsStore};
use mydiet_training::{MetricValue, MetricsMap, NewMetricsRecord};

/// Metrics subcommands
#[derive(Subcommand, Debug)]
pub enum MetricsCommand {
    /// Show the metrics of the most recent training run
    Latest {
        /// Metrics database
        #[arg(long, env = "MYDIET_STORAGE__DATABASE_PATH", default_value = "mydiet.db")]
        db: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recent training runs as JSON, newest first
    History {
        /// Metrics database
        #[arg(long, env = "MYDIET_STORAGE__DATABASE_PATH", default_value = "mydiet.db")]
        db: PathBuf,
        /// Number of runs to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
    /// Record a training run from a JSON file
    Record {
        /// JSON file with `metrics` and optional `model_versions`,
        /// `trained_at` and `dataset_files`
        file: PathBuf,
        /// Metrics database
        #[arg(long, env = "MYDIET_STORAGE__DATABASE_PATH", default_value = "mydiet.db")]
        db: PathBuf,
    },
}

/// Execute metrics command
pub async fn execute(cmd: MetricsCommand) -> Result<()> {
    match cmd {
        MetricsCommand::Latest { db, json } => latest(&db, json).await,
        MetricsCommand::History { db, limit } => history(&db, limit).await,
        MetricsCommand::Record { file, db } => record(&file, &db).await,
    }
}

/// Opens a database that must already exist; read-only commands never create one.
fn open_existing_store(path: &Path) -> Result<SqliteMetricsStore> {
    if !path.exists() {
        bail!("Metrics database {} does not exist (use --db or MYDIET_STORAGE__DATABASE_PATH)", path.display());
    }
    open_store(path)
}

fn open_store(path: &Path) -> Result<SqliteMetricsStore> {
    let db = Database::open(path)
        .with_context(|| format!("Failed to open metrics database {}", path.display()))?;
    Ok(SqliteMetricsStore::new(db))
}

async fn latest(db: &Path, json: bool) -> Result<()> {
    let store = open_existing_store(db)?;
    let Some(record) = store.latest().await? else {
        bail!("No metrics found");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record.metrics)?);
        return Ok(());
    }

    println!("{}", "Latest training run".bold().cyan());
    println!("  Run: {}", format!("#{}", record.id).green());
    println!("  Trained at: {}", record.trained_at.to_rfc3339().green());
    println!();
    println!("{}", "Metrics:".bold());
    print_map(&record.metrics, 1);

    if let Some(versions) = &record.model_versions {
        println!();
        println!("{}", "Model versions:".bold());
        print_map(versions, 1);
    }
    Ok(())
}

fn print_map(map: &MetricsMap, depth: usize) {
    let indent = "  ".repeat(depth);
    for (name, value) in map {
        match value {
            MetricValue::Number(n) => println!("{indent}{name}: {}", n.to_string().yellow()),
            MetricValue::Text(s) => println!("{indent}{name}: {s}"),
            MetricValue::Map(nested) => {
                println!("{indent}{name}:");
                print_map(nested, depth + 1);
            }
        }
    }
}

async fn history(db: &Path, limit: usize) -> Result<()> {
    if limit == 0 {
        bail!("--limit must be at least 1");
    }
    let store = open_existing_store(db)?;
    let records = store.recent(limit).await?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

async fn record(file: &Path, db: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let new: NewMetricsRecord =
        serde_json::from_str(&raw).with_context(|| format!("Invalid metrics file {}", file.display()))?;

    let store = open_store(db)?;
    let stored = store.insert(new).await?;

    println!(
        "{} {} ({})",
        "Recorded training run".green().bold(),
        format!("#{}", stored.id).bold(),
        stored.trained_at.to_rfc3339()
    );
    Ok(())
}
