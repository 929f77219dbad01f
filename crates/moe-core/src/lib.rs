//! Core session orchestration for the Moe millwork assistant.
//!
//! This crate contains the domain layer of the client: conversation state,
//! plan gating, backend seams, and the controllers that sequence requests
//! against the Q&A and file services. It deliberately has no HTTP dependency;
//! concrete backends live in `moe-api` and plug in through the traits in
//! [`backend`].

pub mod backend;
pub mod context;
pub mod error;
pub mod plan;
pub mod session;
pub mod upload;

// Re-export common error type
pub use error::{MoeError, Result};
