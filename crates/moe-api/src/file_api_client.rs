//! FileApiClient - REST client for the Moe file analysis service.
//!
//! One multipart request per file; the batch fan-out lives in
//! `moe_core::upload`, this client only knows how to ship a single file.

use async_trait::async_trait;
use moe_core::backend::FileBackend;
use moe_core::error::{MoeError, Result};
use moe_core::upload::{FileInput, UploadedFile};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::env;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{API_TOKEN_ENV, BASE_URL_ENV};

/// Fallback text when an upload failure body carries no message.
const UPLOAD_FAILED_TEXT: &str = "File upload failed";

/// Client for the file upload endpoint.
#[derive(Clone)]
pub struct FileApiClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

#[derive(Deserialize)]
struct UploadEnvelope {
    data: UploadData,
}

#[derive(Deserialize)]
struct UploadData {
    file: UploadedFileDto,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedFileDto {
    #[serde(rename = "_id")]
    id: String,
    original_name: String,
    size: u64,
    mime_type: String,
    status: String,
}

impl From<UploadedFileDto> for UploadedFile {
    fn from(dto: UploadedFileDto) -> Self {
        UploadedFile::new(dto.id, dto.original_name, dto.size, dto.mime_type, dto.status)
    }
}

#[derive(Deserialize)]
struct UploadFailureBody {
    #[serde(default)]
    message: Option<String>,
}

impl FileApiClient {
    /// Creates a client for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: None,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// `MOE_API_BASE_URL` is required; `MOE_API_TOKEN` is optional.
    pub fn try_from_env() -> Result<Self> {
        let base_url = env::var(BASE_URL_ENV).map_err(|_| {
            MoeError::config(format!("{BASE_URL_ENV} not found in environment variables"))
        })?;
        let mut client = Self::new(base_url);
        client.api_token = env::var(API_TOKEN_ENV).ok();
        Ok(client)
    }

    /// Adds a bearer token sent with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    fn form_for(&self, file: &FileInput) -> Result<Form> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|err| {
                MoeError::upload(&file.name, format!("Invalid MIME type: {err}"))
            })?;
        Ok(Form::new().part("file", part))
    }
}

#[async_trait]
impl FileBackend for FileApiClient {
    async fn upload(&self, file: &FileInput, cancel: CancellationToken) -> Result<UploadedFile> {
        debug!(file = %file.name, size = file.bytes.len(), "uploading file");
        let form = self.form_for(file)?;
        let mut builder = self
            .client
            .post(format!("{}/files/upload", self.base_url))
            .multipart(form);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let call = async {
            let response = builder
                .send()
                .await
                .map_err(|err| MoeError::upload(&file.name, format!("Upload failed: {err}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                // The server message is displayed verbatim when present
                let message = serde_json::from_str::<UploadFailureBody>(&body)
                    .ok()
                    .and_then(|parsed| parsed.message)
                    .unwrap_or_else(|| UPLOAD_FAILED_TEXT.to_string());
                return Err(MoeError::upload(&file.name, message));
            }

            let envelope: UploadEnvelope = response.json().await.map_err(|err| {
                MoeError::response(format!("Failed to parse upload response: {err}"))
            })?;
            Ok(UploadedFile::from(envelope.data.file))
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(MoeError::Cancelled),
            result = call => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moe_core::upload::ANALYSIS_PENDING;

    #[test]
    fn upload_envelope_parses_backend_shape() {
        let raw = r#"{"data":{"file":{"_id":"f-9","originalName":"doors.cab","size":2048,"mimeType":"application/octet-stream","status":"processing"}}}"#;
        let envelope: UploadEnvelope = serde_json::from_str(raw).unwrap();
        let file: UploadedFile = envelope.data.file.into();

        assert_eq!(file.id, "f-9");
        assert_eq!(file.name, "doors.cab");
        assert_eq!(file.size, 2048);
        assert_eq!(file.status, "processing");
        assert_eq!(file.analysis_summary, ANALYSIS_PENDING);
    }

    #[test]
    fn failure_body_message_is_optional() {
        let parsed: UploadFailureBody =
            serde_json::from_str(r#"{"message":"Unsupported file type"}"#).unwrap();
        assert_eq!(parsed.message.as_deref(), Some("Unsupported file type"));

        let parsed: UploadFailureBody = serde_json::from_str("{}").unwrap();
        assert!(parsed.message.is_none());
    }
}
