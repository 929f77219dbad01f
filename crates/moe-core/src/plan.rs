//! Subscription plan gating.
//!
//! The plan gate is a pure, client-side pre-filter: it avoids pointless
//! round trips and lets the UI show an immediate upgrade prompt. The backend
//! remains the authority on quota and upload acceptance.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Subscription level determining model quality, daily quota, and upload
/// permission.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Pro,
    Enterprise,
}

/// Capability flags derived from a plan tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// Label of the model answering for this tier.
    pub model_label: &'static str,
    /// Whether the file upload path is available at all.
    pub uploads_allowed: bool,
    /// Display label for the tier's quota, e.g. "Free Plan (5 queries/day)".
    pub quota_label: String,
}

impl PlanTier {
    /// Returns true for any tier above Free.
    pub fn is_paid(self) -> bool {
        !matches!(self, PlanTier::Free)
    }

    /// Human-readable tier name, e.g. "Pro".
    pub fn display_name(self) -> &'static str {
        match self {
            PlanTier::Free => "Free",
            PlanTier::Pro => "Pro",
            PlanTier::Enterprise => "Enterprise",
        }
    }

    /// Maps the tier to its capability flags. Pure and synchronous, no
    /// failure mode.
    pub fn capabilities(self) -> Capabilities {
        match self {
            PlanTier::Free => Capabilities {
                model_label: "gpt-4o-mini",
                uploads_allowed: false,
                quota_label: "Free Plan (5 queries/day)".to_string(),
            },
            tier => Capabilities {
                model_label: "gpt-4o",
                uploads_allowed: true,
                quota_label: format!("{} Plan", tier.display_name()),
            },
        }
    }
}
