//! JSON error responses for the HTTP boundary.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mydiet_training::TrainerError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::error::error_chain;
use crate::storage::StorageError;

/// Every failure a handler can report, rendered as `{"error": "<message>"}`.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed input (400).
    #[error("{0}")]
    Validation(String),

    /// Nothing matched the request (404).
    #[error("{0}")]
    NotFound(String),

    /// The trainer call failed, timed out or returned a fault (500).
    #[error("{0}")]
    Upstream(String),

    /// The metrics store failed (500).
    #[error("{0}")]
    Store(String),

    /// Known path, unsupported method (405).
    #[error("{0}")]
    MethodNotAllowed(String),

    /// The client exceeded its request budget (429).
    #[error("{0}")]
    RateLimited(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TrainerError> for ApiError {
    fn from(err: TrainerError) -> Self {
        Self::Upstream(error_chain(&err))
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self::Store(error_chain(&err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
