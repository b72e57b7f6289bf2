use thiserror::Error;

pub type TrainerResult<T> = std::result::Result<T, TrainerError>;

/// Errors raised while talking to the external trainer service.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("invalid trainer base url: {0}")]
    InvalidBaseUrl(String),

    #[error("invalid trainer request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("Request failed with status code {status}")]
    Status { status: u16 },

    #[error("trainer returned a non-JSON response: {0}")]
    InvalidBody(String),
}

/// Errors raised while validating a metrics payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetricsError {
    #[error("unsupported metric value: {0} (expected a number, string or object)")]
    UnsupportedValue(&'static str),

    #[error("invalid trained_at timestamp: {0}")]
    InvalidTimestamp(String),
}
