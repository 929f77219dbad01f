//! Error types for the Moe session layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fallback text shown in the conversation when a failure carries no
/// human-readable message of its own.
pub const GENERIC_FAILURE_TEXT: &str = "Something went wrong. Please try again.";

/// A shared error type for the Moe client.
///
/// This provides typed, structured error variants so callers can classify
/// failures without string matching. None of these variants is fatal to a
/// session; the conversation stays usable after every one of them.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum MoeError {
    /// The backend rejected the request because the daily question quota
    /// is exhausted. Expected and recoverable, never logged as an error.
    #[error("Daily question quota exhausted: {message}")]
    QuotaExceeded { message: String },

    /// Network or server failure while talking to a backend.
    #[error("Request failed: {0}")]
    Request(String),

    /// The backend answered, but the payload could not be parsed.
    #[error("Malformed response: {0}")]
    Response(String),

    /// A single file in an upload batch was rejected.
    #[error("Upload of '{file_name}' failed: {message}")]
    Upload { file_name: String, message: String },

    /// The session's cancellation token fired while the call was in flight.
    #[error("Operation cancelled")]
    Cancelled,

    /// Client construction or configuration problem.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MoeError {
    /// Creates a QuotaExceeded error
    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::QuotaExceeded {
            message: message.into(),
        }
    }

    /// Creates a Request error
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request(message.into())
    }

    /// Creates a Response error
    pub fn response(message: impl Into<String>) -> Self {
        Self::Response(message.into())
    }

    /// Creates an Upload error for a single file
    pub fn upload(file_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upload {
            file_name: file_name.into(),
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a QuotaExceeded error
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    /// Check if this is a Cancelled error
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The text suitable for rendering inline in the conversation.
    ///
    /// Server-provided messages are passed through verbatim; failures with
    /// no displayable message fall back to [`GENERIC_FAILURE_TEXT`].
    pub fn user_message(&self) -> String {
        match self {
            Self::QuotaExceeded { message } => message.clone(),
            Self::Request(message) => message.clone(),
            Self::Upload { message, .. } => message.clone(),
            Self::Response(_) | Self::Config(_) | Self::Cancelled => {
                GENERIC_FAILURE_TEXT.to_string()
            }
        }
    }
}

/// A type alias for `Result<T, MoeError>`.
pub type Result<T> = std::result::Result<T, MoeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_predicate_matches_only_quota_variant() {
        assert!(MoeError::quota_exceeded("limit reached").is_quota_exceeded());
        assert!(!MoeError::request("boom").is_quota_exceeded());
        assert!(!MoeError::Cancelled.is_quota_exceeded());
    }

    #[test]
    fn user_message_passes_server_text_through() {
        let err = MoeError::request("upstream unavailable");
        assert_eq!(err.user_message(), "upstream unavailable");

        let err = MoeError::upload("doors.cab", "file too large");
        assert_eq!(err.user_message(), "file too large");
    }

    #[test]
    fn user_message_falls_back_for_parse_failures() {
        let err = MoeError::response("missing field `answer`");
        assert_eq!(err.user_message(), GENERIC_FAILURE_TEXT);
    }
}
