//! File ingestion for multipart uploads.
//!
//! Runs before the upload handler: the `multipart/form-data` body is read
//! into memory and the first file part named `file` becomes an
//! [`UploadedFile`]. A request without such a part yields `FileUpload(None)`
//! and the handler decides what that means.

use axum::async_trait;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::HeaderMap;
use axum::http::header::CONTENT_TYPE;
use mydiet_training::{UPLOAD_FIELD, UploadedFile};
use tracing::debug;

use crate::server::error::ApiError;

/// The uploaded dataset file, if the request carried one.
#[derive(Debug)]
pub struct FileUpload(pub Option<UploadedFile>);

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
}

#[async_trait]
impl<S> FromRequest<S> for FileUpload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(req.headers()) {
            return Ok(Self(None));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::validation(format!("Invalid multipart body: {}", e.body_text())))?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::validation(format!("Invalid multipart body: {}", e.body_text())))?
        {
            if field.name() != Some(UPLOAD_FIELD) {
                continue;
            }
            // A plain form value named `file` is not an upload
            let Some(file_name) = field.file_name().map(ToString::to_string) else {
                continue;
            };

            let content_type = field.content_type().map(ToString::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation(format!("Failed to read uploaded file: {}", e.body_text())))?;
            debug!(file_name = %file_name, size = data.len(), content_type = ?content_type, "Received uploaded file");
            let mut file = UploadedFile::new(file_name, data);
            file.content_type = content_type;
            return Ok(Self(Some(file)));
        }

        Ok(Self(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_is_multipart() {
        let mut headers = HeaderMap::new();
        assert!(!is_multipart(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(!is_multipart(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("multipart/form-data; boundary=abc"));
        assert!(is_multipart(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("Multipart/Form-Data; boundary=abc"));
        assert!(is_multipart(&headers));
    }
}
