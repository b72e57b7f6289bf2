//! Request handlers for the ML gateway.
//!
//! Upload and retrain are relays: the trainer's JSON comes back unchanged.
//! Metrics handlers read from and write to the metrics store.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use mydiet_training::{MetricsMap, MetricsRecord, NewMetricsRecord};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::server::error::ApiError;
use crate::server::state::AppState;
use crate::server::upload::FileUpload;

/// Default number of records returned by the history endpoint.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;
/// Upper bound for the history endpoint's `limit`.
pub const MAX_HISTORY_LIMIT: usize = 100;

/// `POST /api/upload_csv`
pub async fn upload_csv(
    State(state): State<AppState>,
    FileUpload(file): FileUpload,
) -> Result<Json<Value>, ApiError> {
    let file = file.ok_or_else(|| ApiError::validation("No file uploaded"))?;
    info!(file_name = %file.file_name, size = file.len(), "Relaying dataset to trainer");
    let body = state.trainer.upload_dataset(file).await?;
    Ok(Json(body))
}

/// `POST /api/retrain`
pub async fn retrain(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    info!(trainer = state.trainer.id(), "Triggering retrain");
    let body = state.trainer.retrain().await?;
    Ok(Json(body))
}

/// `GET /api/metrics` - the `metrics` of the most recent training run.
pub async fn latest_metrics(State(state): State<AppState>) -> Result<Json<MetricsMap>, ApiError> {
    let latest = state.store.latest().await?.ok_or_else(|| ApiError::not_found("No metrics found"))?;
    Ok(Json(latest.metrics))
}

/// `POST /api/metrics` - records a completed training run.
pub async fn record_metrics(
    State(state): State<AppState>,
    payload: Result<Json<NewMetricsRecord>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(record) = payload.map_err(|e| ApiError::validation(e.body_text()))?;
    let stored = state.store.insert(record).await?;
    info!(id = stored.id, trained_at = %stored.trained_at, "Recorded training metrics");
    Ok((StatusCode::CREATED, Json(json!({ "id": stored.id, "trained_at": stored.trained_at }))))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

/// `GET /api/metrics/history?limit=N` - full records, newest first.
pub async fn metrics_history(
    State(state): State<AppState>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<Vec<MetricsRecord>>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::validation(e.body_text()))?;
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(ApiError::validation(format!(
            "limit must be between 1 and {MAX_HISTORY_LIMIT}"
        )));
    }
    Ok(Json(state.store.recent(limit).await?))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "mydiet-ml-gateway" }))
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

/// Fallback for known paths hit with an unsupported method.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed("Method not allowed".to_string())
}
