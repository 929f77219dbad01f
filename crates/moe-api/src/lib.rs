//! HTTP backends for the Moe session layer.
//!
//! Implements the `moe-core` backend traits against the remote Q&A and file
//! services with `reqwest`. Each client is a thin, cloneable wrapper around
//! a shared connection pool; cancellation is honored by racing every call
//! against the session's token.

mod file_api_client;
mod qa_api_client;

pub use file_api_client::FileApiClient;
pub use qa_api_client::QaApiClient;

/// Environment variable naming the API base URL.
pub const BASE_URL_ENV: &str = "MOE_API_BASE_URL";
/// Environment variable naming the optional bearer token.
pub const API_TOKEN_ENV: &str = "MOE_API_TOKEN";
