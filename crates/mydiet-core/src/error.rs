//! Error types for MyDiet Core.

use crate::storage::StorageError;
use mydiet_training::TrainerError;
use thiserror::Error;

/// Startup and lifecycle errors of the gateway.
///
/// Per-request failures never reach this type; they are rendered by
/// [`crate::server::ApiError`] at the handler boundary.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration source errors (unreadable file, bad env value)
    #[error("Configuration error: {0}")]
    Settings(#[from] ::config::ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Trainer client errors
    #[error("Trainer error: {0}")]
    Trainer(#[from] TrainerError),
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Renders an error together with its chain of sources.
///
/// Sources whose text is already part of the message are skipped.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
