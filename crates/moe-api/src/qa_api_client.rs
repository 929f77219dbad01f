//! QaApiClient - REST client for the Moe question-answering service.
//!
//! Configuration priority: explicit constructor arguments > environment
//! variables (`MOE_API_BASE_URL`, `MOE_API_TOKEN`).

use async_trait::async_trait;
use moe_core::backend::{AskAnswer, AskRequest, QaBackend};
use moe_core::error::{MoeError, Result};
use moe_core::session::VoteDirection;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{API_TOKEN_ENV, BASE_URL_ENV};

/// Client for the ask and vote endpoints.
#[derive(Clone)]
pub struct QaApiClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

#[derive(Serialize)]
struct AskRequestBody<'a> {
    message: &'a str,
    platform: &'a str,
    version: Option<&'a str>,
}

#[derive(Deserialize)]
struct AskEnvelope {
    data: AskData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AskData {
    answer: String,
    model_used: String,
    #[serde(default)]
    tokens: Option<u32>,
    answer_id: String,
    #[serde(default)]
    is_cache_hit: bool,
    #[serde(default)]
    sources: Option<Vec<String>>,
}

impl From<AskData> for AskAnswer {
    fn from(data: AskData) -> Self {
        Self {
            answer: data.answer,
            model_used: data.model_used,
            tokens: data.tokens,
            answer_id: data.answer_id,
            is_cache_hit: data.is_cache_hit,
            sources: data.sources.unwrap_or_default(),
        }
    }
}

/// Failure body shape shared by the Moe endpoints. `upgradeRequired=true`
/// is the sole discriminator between quota exhaustion and generic failure.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiFailureBody {
    #[serde(default)]
    upgrade_required: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
struct VoteRequestBody {
    vote: VoteDirection,
}

impl QaApiClient {
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

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Maps a non-success ask/vote response to the session error taxonomy.
fn classify_failure(status: StatusCode, body: &str) -> MoeError {
    match serde_json::from_str::<ApiFailureBody>(body) {
        Ok(parsed) if parsed.upgrade_required => MoeError::quota_exceeded(
            parsed
                .message
                .unwrap_or_else(|| "Daily question limit reached.".to_string()),
        ),
        Ok(parsed) => MoeError::request(
            parsed
                .message
                .unwrap_or_else(|| format!("Server returned {status}")),
        ),
        Err(_) => MoeError::request(format!("Server returned {status}")),
    }
}

#[async_trait]
impl QaBackend for QaApiClient {
    async fn ask(&self, request: AskRequest, cancel: CancellationToken) -> Result<AskAnswer> {
        debug!(platform = %request.platform, "submitting ask request");
        let body = AskRequestBody {
            message: &request.message,
            platform: &request.platform,
            version: request.version.as_deref(),
        };
        let builder = self
            .authorize(self.client.post(self.endpoint("/questions/ask")))
            .json(&body);

        let call = async {
            let response = builder
                .send()
                .await
                .map_err(|err| MoeError::request(format!("Ask request failed: {err}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(classify_failure(status, &body));
            }

            let envelope: AskEnvelope = response
                .json()
                .await
                .map_err(|err| MoeError::response(format!("Failed to parse ask response: {err}")))?;
            Ok(AskAnswer::from(envelope.data))
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(MoeError::Cancelled),
            result = call => result,
        }
    }

    async fn vote(
        &self,
        answer_id: &str,
        direction: VoteDirection,
        cancel: CancellationToken,
    ) -> Result<()> {
        let path = format!("/answers/{answer_id}/vote");
        let builder = self
            .authorize(self.client.post(self.endpoint(&path)))
            .json(&VoteRequestBody { vote: direction });

        let call = async {
            let response = builder
                .send()
                .await
                .map_err(|err| MoeError::request(format!("Vote request failed: {err}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(classify_failure(status, &body));
            }
            Ok(())
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(MoeError::Cancelled),
            result = call => result,
        }
    }
}
