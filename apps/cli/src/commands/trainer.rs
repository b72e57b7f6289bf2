//! `mydiet retrain` and `mydiet upload`: direct calls to the trainer.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use mydiet_training::{HttpTrainer, Trainer, UploadedFile};
use serde_json::Value;

/// Where to find the trainer.
#[derive(Args, Debug)]
pub struct TrainerArgs {
    /// Trainer base URL, e.g. http://localhost:5001
    #[arg(long = "trainer", env = "MYDIET_TRAINER__BASE_URL")]
    pub base_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,
}

impl TrainerArgs {
    fn client(&self) -> Result<HttpTrainer> {
        HttpTrainer::new(&self.base_url, Duration::from_secs(self.timeout_secs))
            .with_context(|| format!("Invalid trainer URL '{}'", self.base_url))
    }
}

/// Trigger a retraining run and print the trainer's reply.
pub async fn retrain(args: &TrainerArgs) -> Result<()> {
    let trainer = args.client()?;
    let reply = trainer.retrain().await.context("Retrain request failed")?;

    println!("{}", "Retrain triggered".green().bold());
    print_reply(&reply)
}

/// Upload `path` to the trainer under its own file name.
pub async fn upload(path: &Path, args: &TrainerArgs) -> Result<()> {
    let trainer = args.client()?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("'{}' has no file name", path.display()))?;
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let file = UploadedFile::new(file_name, data);
    let size = file.len();
    let reply = trainer.upload_dataset(file).await.context("Upload failed")?;

    println!("{} ({} bytes)", "Dataset uploaded".green().bold(), size);
    print_reply(&reply)
}

fn print_reply(reply: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(reply)?);
    Ok(())
}
