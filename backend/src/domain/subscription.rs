//! Billing subscription state as seen by the feed entry point.

use std::fmt;

use serde::Serialize;
use utoipa::ToSchema;

/// Provider statuses that grant feed access.
const ACTIVE_STATUSES: [&str; 3] = ["active", "trialing", "past_due"];

/// Coarse subscription state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionState {
    /// Paying, trialing, or in the payment grace window.
    Active,
    /// No billing record, or a lapsed/cancelled plan.
    Inactive,
    /// Not checked for this request.
    #[default]
    Unknown,
    /// The lookup failed.
    Error,
}

impl SubscriptionState {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Unknown => "unknown",
            Self::Error => "error",
        }
    }

    /// Whether the state grants access.
    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fold a raw provider status into a [`SubscriptionState`].
///
/// # Examples
/// ```
/// use session_gate::domain::{SubscriptionState, classify_status};
///
/// assert_eq!(classify_status(Some("Trialing")), SubscriptionState::Active);
/// assert_eq!(classify_status(Some("canceled")), SubscriptionState::Inactive);
/// assert_eq!(classify_status(None), SubscriptionState::Inactive);
/// ```
pub fn classify_status(status: Option<&str>) -> SubscriptionState {
    let active = status.is_some_and(|raw| {
        let raw = raw.trim();
        ACTIVE_STATUSES
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(raw))
    });
    if active {
        SubscriptionState::Active
    } else {
        SubscriptionState::Inactive
    }
}
