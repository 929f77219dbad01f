//! Session domain module.
//!
//! This module contains the conversation state and the controller that
//! sequences requests against the Q&A backend.
//!
//! # Module Structure
//!
//! - `message`: Conversation entry types (`Message`, `Sender`, `VoteDirection`)
//! - `log`: Append-only message log (`MessageLog`)
//! - `controller`: Request orchestration (`ConversationController`)

mod controller;
mod log;
mod message;

// Re-export public API
pub use controller::{ConversationController, SubmitOutcome, VoteOutcome};
pub use log::MessageLog;
pub use message::{Message, Sender, VoteDirection};
