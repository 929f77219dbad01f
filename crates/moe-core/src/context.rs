//! Session context threaded into the controllers at construction time.

use tokio_util::sync::CancellationToken;

use crate::plan::{Capabilities, PlanTier};

/// Platform identifier sent with every ask request.
pub const DEFAULT_PLATFORM: &str = "mozaik";

/// Explicit per-session configuration.
///
/// Replaces ambient mutable state (plan tier, platform) with a value that is
/// handed to [`ConversationController`](crate::session::ConversationController)
/// and [`FileBatchUploader`](crate::upload::FileBatchUploader) when they are
/// built. The embedded [`CancellationToken`] is shared by every clone, so
/// cancelling it on session teardown aborts all in-flight backend calls.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Subscription tier for this session.
    pub plan: PlanTier,
    /// Platform identifier carried on ask requests.
    pub platform: String,
    /// Optional client version carried on ask requests.
    pub client_version: Option<String>,
    cancel: CancellationToken,
}

impl SessionContext {
    /// Creates a context for the given plan tier with the default platform
    /// and a fresh cancellation token.
    pub fn new(plan: PlanTier) -> Self {
        Self {
            plan,
            platform: DEFAULT_PLATFORM.to_string(),
            client_version: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Overrides the platform identifier.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Sets the client version reported to the backend.
    pub fn with_client_version(mut self, version: impl Into<String>) -> Self {
        self.client_version = Some(version.into());
        self
    }

    /// Capability flags for this session's plan.
    pub fn capabilities(&self) -> Capabilities {
        self.plan.capabilities()
    }

    /// A token handle to pass into a backend call.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Aborts all in-flight work issued under this context.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
