//! MyDiet Core - ML gateway between the diet web app and the trainer service.
//!
//! This crate provides:
//! - the HTTP gateway (dataset upload relay, retrain trigger, metrics queries)
//! - the SQLite-backed metrics store
//! - configuration and tracing setup
//!
//! # Example
//!
//! ```rust,no_run
//! use mydiet_core::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> mydiet_core::error::Result<()> {
//!     let config = Config::load(None)?;
//!     server::run(&config).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod server;
pub mod storage;
pub mod telemetry;

pub use config::Config;
pub use error::{GatewayError, Result};
pub use server::{ApiError, AppState};
pub use storage::{Database, MetricsStore, SqliteMetricsStore, StorageError};
