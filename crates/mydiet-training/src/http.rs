//! HTTP client for the external trainer service.
//!
//! The trainer exposes two endpoints under its base URL:
//!
//! - `POST /api/upload_csv` - multipart upload, dataset under the `file` field
//! - `POST /api/retrain_model` - empty body, starts a retraining run
//!
//! Both return JSON that is passed through untouched. Any non-2xx status is
//! collapsed into [`TrainerError::Status`]; nothing is retried.

use crate::error::{TrainerError, TrainerResult};
use crate::trainer::Trainer;
use crate::upload::UploadedFile;
use async_trait::async_trait;
use mime_guess::mime::Mime;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Trainer endpoint that ingests a dataset file.
pub const UPLOAD_PATH: &str = "/api/upload_csv";
/// Trainer endpoint that starts a retraining run.
pub const RETRAIN_PATH: &str = "/api/retrain_model";
/// Multipart field the dataset is sent under.
pub const UPLOAD_FIELD: &str = "file";

/// Parses and checks a trainer base URL.
pub fn parse_base_url(raw: &str) -> TrainerResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| TrainerError::InvalidBaseUrl(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(TrainerError::InvalidBaseUrl(format!(
            "{raw}: scheme must be http or https"
        )));
    }
    Ok(url)
}

/// [`Trainer`] backed by the trainer's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpTrainer {
    /// Base URL without a trailing slash (e.g. "http://localhost:5001").
    base_url: String,
    client: Client,
}

impl HttpTrainer {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Creates a client for the trainer at `base_url`.
    ///
    /// `timeout` bounds each outbound request end to end; an expired request
    /// surfaces as [`TrainerError::Transport`].
    pub fn new(base_url: &str, timeout: Duration) -> TrainerResult<Self> {
        parse_base_url(base_url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: base_url.trim().trim_end_matches('/').to_string(), client })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json(url: &str, response: Response) -> TrainerResult<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url, status = status.as_u16(), body = %body, "Trainer rejected request");
            return Err(TrainerError::Status { status: status.as_u16() });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| TrainerError::InvalidBody(e.to_string()))
    }
}

/// The client's part content type when it parses, else a guess from the extension.
fn part_mime(file: &UploadedFile) -> Mime {
    file.content_type
        .as_deref()
        .and_then(|ct| ct.parse::<Mime>().ok())
        .unwrap_or_else(|| mime_guess::from_path(&file.file_name).first_or_octet_stream())
}

#[async_trait]
impl Trainer for HttpTrainer {
    fn id(&self) -> &'static str {
        "http"
    }

    async fn upload_dataset(&self, file: UploadedFile) -> TrainerResult<Value> {
        let url = self.endpoint(UPLOAD_PATH);
        let size = file.len();
        let mime = part_mime(&file);
        debug!(url = %url, file_name = %file.file_name, size, mime = %mime, "Relaying dataset upload");

        let part = Part::stream_with_length(Body::from(file.data), size as u64)
            .file_name(file.file_name)
            .mime_str(mime.as_ref())
            .map_err(|e| TrainerError::InvalidRequest(format!("invalid part content type: {e}")))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self.client.post(&url).multipart(form).send().await?;
        let body = Self::read_json(&url, response).await?;
        info!(url = %url, size, "Dataset upload relayed");
        Ok(body)
    }

    async fn retrain(&self) -> TrainerResult<Value> {
        let url = self.endpoint(RETRAIN_PATH);
        debug!(url = %url, "Triggering retrain");

        let response = self.client.post(&url).send().await?;
        let body = Self::read_json(&url, response).await?;
        info!(url = %url, "Retrain triggered");
        Ok(body)
    }
}
