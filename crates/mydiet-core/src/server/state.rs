//! Shared application state.

use std::sync::Arc;

use mydiet_training::{HttpTrainer, Trainer};

use crate::config::Config;
use crate::error::Result;
use crate::storage::{Database, MetricsStore, SqliteMetricsStore};

/// Collaborators shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MetricsStore>,
    pub trainer: Arc<dyn Trainer>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &"<MetricsStore>")
            .field("trainer", &self.trainer.id())
            .finish()
    }
}

impl AppState {
    pub fn new(store: Arc<dyn MetricsStore>, trainer: Arc<dyn Trainer>) -> Self {
        Self { store, trainer }
    }

    /// Builds the production collaborators from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the database
    /// cannot be opened.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let trainer = HttpTrainer::new(config.trainer.base_url()?, config.trainer.timeout())?;
        let db = Database::open(&config.storage.database_path)?;
        Ok(Self::new(Arc::new(SqliteMetricsStore::new(db)), Arc::new(trainer)))
    }
}
