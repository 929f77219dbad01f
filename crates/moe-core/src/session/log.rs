//! Append-only conversation log.

use super::message::{Message, VoteDirection};

/// Ordered sequence of conversation entries.
///
/// The log is append-only: entries never reorder and are never removed for
/// the life of the session. Identifiers are allocated here so they stay
/// monotonically increasing regardless of which operation appends.
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Vec<Message>,
    next_id: u64,
}

impl MessageLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Appends the entry built by `build`, handing it the next identifier.
    pub fn append_with(&mut self, build: impl FnOnce(u64) -> Message) -> &Message {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(build(id));
        // Safe to unwrap because we just pushed an element
        self.entries.last().unwrap()
    }

    /// All entries in append order.
    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sets the vote on the entry whose `answer_id` matches.
    ///
    /// Last write wins; no toggle-off. Returns false when no entry carries
    /// the given answer id.
    pub fn set_vote(&mut self, answer_id: &str, direction: VoteDirection) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|message| message.answer_id.as_deref() == Some(answer_id))
        {
            Some(message) => {
                message.user_vote = Some(direction);
                true
            }
            None => false,
        }
    }
}
