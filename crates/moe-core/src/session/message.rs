//! Conversation message types.

use chrono::Local;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::backend::AskAnswer;

/// Represents the sender of a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sender {
    /// Entry typed by the user.
    User,
    /// Entry produced by the assistant (including synthetic diagnostics).
    Bot,
}

/// User-submitted helpfulness signal for an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

/// One conversation entry.
///
/// Messages are created only by the
/// [`ConversationController`](super::ConversationController) and are never
/// deleted for the life of the session. `answer_id`, once set, is immutable
/// and unique per conversation; voting only mutates `user_vote` on the entry
/// whose `answer_id` matches. `upgrade_required` and `error` are mutually
/// exclusive on the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Monotonically increasing identifier, unique in creation order.
    pub id: u64,
    /// Content (user question or rendered answer/diagnostic string).
    pub text: String,
    /// Who produced this entry.
    pub sender: Sender,
    /// Display-formatted creation time.
    pub timestamp: String,
    /// Model that produced a bot answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    /// Tokens consumed, when the backend reports them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
    /// Backend-assigned answer identifier, the vote correlation key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_id: Option<String>,
    /// Whether the answer was served from cache.
    #[serde(default)]
    pub is_cache_hit: bool,
    /// Ordered citation strings.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Locally recorded vote, last write wins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_vote: Option<VoteDirection>,
    /// Set on the synthetic prompt appended when the daily quota is hit.
    #[serde(default)]
    pub upgrade_required: bool,
    /// Set on the synthetic entry appended for any other failure.
    #[serde(default)]
    pub error: bool,
}

fn display_timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

impl Message {
    fn base(id: u64, sender: Sender, text: String) -> Self {
        Self {
            id,
            text,
            sender,
            timestamp: display_timestamp(),
            model_used: None,
            tokens_used: None,
            answer_id: None,
            is_cache_hit: false,
            sources: Vec::new(),
            user_vote: None,
            upgrade_required: false,
            error: false,
        }
    }

    /// A user-submitted question.
    pub fn user(id: u64, text: impl Into<String>) -> Self {
        Self::base(id, Sender::User, text.into())
    }

    /// A bot entry populated from a successful answer payload.
    pub fn from_answer(id: u64, answer: AskAnswer) -> Self {
        let mut message = Self::base(id, Sender::Bot, answer.answer);
        message.model_used = Some(answer.model_used);
        message.tokens_used = answer.tokens;
        message.answer_id = Some(answer.answer_id);
        message.is_cache_hit = answer.is_cache_hit;
        message.sources = answer.sources;
        message
    }

    /// The synthetic prompt appended when the backend signals quota
    /// exhaustion. References the query that triggered it.
    pub fn upgrade_prompt(id: u64, query: &str, model_label: &str) -> Self {
        let text = format!(
            "I'd love to help with \"{query}\", but you've reached your daily limit. \
             Upgrade to continue getting expert millwork guidance."
        );
        let mut message = Self::base(id, Sender::Bot, text);
        message.model_used = Some(model_label.to_string());
        message.upgrade_required = true;
        message
    }

    /// The synthetic entry appended for any non-quota failure.
    pub fn failure(id: u64, text: impl Into<String>, model_label: &str) -> Self {
        let mut message = Self::base(id, Sender::Bot, text.into());
        message.model_used = Some(model_label.to_string());
        message.error = true;
        message
    }
}
