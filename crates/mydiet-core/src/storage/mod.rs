//! Storage layer for MyDiet Core.
//!
//! Training-run metrics are persisted in SQLite through a repository
//! ([`SqliteMetricsRepository`]) and exposed to async code through the
//! [`MetricsStore`] trait.

// SQL strings don't need hash-less raw strings
#![allow(clippy::needless_raw_string_hashes)]

pub mod database;
pub mod error;
pub mod metrics_store;

pub use database::Database;
pub use error::{StorageError, StorageResult};
pub use metrics_store::{MetricsStore, SqliteMetricsRepository, SqliteMetricsStore};
