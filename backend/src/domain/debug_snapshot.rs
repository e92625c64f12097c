//! Diagnostics attached to responses when `debug=1` is set.

use serde::Serialize;
use utoipa::ToSchema;

use super::{FeedReport, FlowReport, RedirectReason, Session, SignalName, SubscriptionState};

/// What the flow knew when it answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DebugSnapshot {
    /// Request path.
    pub route: String,
    /// Whether session resolution finished.
    pub auth_ready: bool,
    /// Abbreviated user id, or `none`.
    pub session_user_id: String,
    /// Billing state observed.
    pub subscription_status: SubscriptionState,
    /// Branch that fired.
    pub last_redirect_reason: RedirectReason,
    /// Signal that settled resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_by: Option<SignalName>,
    /// Resolution time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

fn user_label(session: Option<&Session>) -> String {
    session.map_or_else(|| "none".to_owned(), |s| s.user_id().short_form())
}

impl DebugSnapshot {
    /// Snapshot after an auth flow.
    pub fn from_flow(route: impl Into<String>, report: &FlowReport) -> Self {
        Self {
            route: route.into(),
            auth_ready: true,
            session_user_id: user_label(report.session.as_ref()),
            subscription_status: SubscriptionState::Unknown,
            last_redirect_reason: report.redirect_reason(),
            settled_by: report.settled_by,
            elapsed_ms: Some(u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX)),
        }
    }

    /// Snapshot after a feed re-validation.
    pub fn from_feed(route: impl Into<String>, report: &FeedReport) -> Self {
        Self {
            route: route.into(),
            auth_ready: true,
            session_user_id: user_label(report.session.as_ref()),
            subscription_status: report.subscription,
            last_redirect_reason: report.redirect_reason(),
            settled_by: None,
            elapsed_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FlowOutcome, Navigation};
    use crate::test_support::session_for;
    use rstest::rstest;
    use serde_json::json;
    use std::time::Duration;

    #[rstest]
    fn flow_snapshot_abbreviates_user_and_uses_camel_case() {
        let report = FlowReport {
            outcome: FlowOutcome::Navigated(Navigation::new(
                "/journalist/dashboard",
                RedirectReason::Journalist,
            )),
            settled_by: Some(SignalName::CodeExchange),
            elapsed: Duration::from_millis(245),
            session: Some(session_for("3fa85f64-5717-4562-b3fc-2c963f66afa6")),
        };
        let snapshot = DebugSnapshot::from_flow("/auth/callback", &report);
        let value = serde_json::to_value(&snapshot).expect("serialise");
        assert_eq!(
            value,
            json!({
                "route": "/auth/callback",
                "authReady": true,
                "sessionUserId": "3fa85f64...",
                "subscriptionStatus": "unknown",
                "lastRedirectReason": "journalist",
                "settledBy": "code_exchange",
                "elapsedMs": 245,
            })
        );
    }

    #[rstest]
    fn missing_session_reads_none() {
        let report = FlowReport {
            outcome: FlowOutcome::SignedOut,
            settled_by: None,
            elapsed: Duration::ZERO,
            session: None,
        };
        let snapshot = DebugSnapshot::from_flow("/auth/session", &report);
        assert_eq!(snapshot.session_user_id, "none");
        assert_eq!(snapshot.last_redirect_reason, RedirectReason::NoSession);
    }
}
