//! Backend seams for the Q&A and file services.
//!
//! The controllers in this crate talk to remote services exclusively through
//! these traits. Concrete HTTP implementations live in `moe-api`; tests plug
//! in mocks. Every call receives a [`CancellationToken`] so session teardown
//! can abort in-flight work deterministically.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::context::SessionContext;
use crate::error::Result;
use crate::session::VoteDirection;
use crate::upload::{FileInput, UploadedFile};

/// One question submitted to the Q&A service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    /// The user's question text, already trimmed.
    pub message: String,
    /// Platform identifier, e.g. "mozaik".
    pub platform: String,
    /// Optional client version; sent as `null` when absent.
    pub version: Option<String>,
}

impl AskRequest {
    /// Builds a request for `text` carrying the session's platform and
    /// version fields.
    pub fn from_context(context: &SessionContext, text: impl Into<String>) -> Self {
        Self {
            message: text.into(),
            platform: context.platform.clone(),
            version: context.client_version.clone(),
        }
    }
}

/// A successful answer from the Q&A service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskAnswer {
    /// The rendered answer text.
    pub answer: String,
    /// Which model produced the answer.
    pub model_used: String,
    /// Tokens consumed, when the backend reports them.
    pub tokens: Option<u32>,
    /// Backend-assigned identifier used as the vote correlation key.
    pub answer_id: String,
    /// Whether the answer was served from a previously computed result.
    pub is_cache_hit: bool,
    /// Ordered citation strings.
    pub sources: Vec<String>,
}

/// Remote question-answering service.
#[async_trait]
pub trait QaBackend: Send + Sync {
    /// Submits a question and waits for the answer.
    ///
    /// # Errors
    ///
    /// - [`MoeError::QuotaExceeded`](crate::MoeError::QuotaExceeded) when the
    ///   backend signals the daily limit via its upgrade flag
    /// - [`MoeError::Cancelled`](crate::MoeError::Cancelled) when `cancel`
    ///   fires before the call settles
    /// - [`MoeError::Request`](crate::MoeError::Request) /
    ///   [`MoeError::Response`](crate::MoeError::Response) for transport and
    ///   parse failures
    async fn ask(&self, request: AskRequest, cancel: CancellationToken) -> Result<AskAnswer>;

    /// Records a helpfulness vote for a previously received answer.
    ///
    /// Callers treat the result as advisory; see
    /// [`ConversationController::submit_vote`](crate::session::ConversationController::submit_vote).
    async fn vote(
        &self,
        answer_id: &str,
        direction: VoteDirection,
        cancel: CancellationToken,
    ) -> Result<()>;
}

/// Remote file analysis service.
#[async_trait]
pub trait FileBackend: Send + Sync {
    /// Uploads a single file and returns its recorded metadata.
    async fn upload(&self, file: &FileInput, cancel: CancellationToken) -> Result<UploadedFile>;
}
