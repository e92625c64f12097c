//! Independent re-validation when the shared feed is entered.
//!
//! The navigation that lands a user on the feed and the feed request itself
//! are not atomic, so the feed re-checks the session, onboarding state, role
//! and billing status before serving anything.

use std::sync::Arc;

use tracing::warn;

use super::flow_log::flow_event;
use super::ports::{ClientContext, IdentityProvider, SubscriptionStatusQuery};
use super::{
    GateDecision, Navigation, ProfileGate, RedirectReason, Role, RouteDispatcher, Session,
    SubscriptionState, classify_status,
};

/// Whether the feed may be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedAccess {
    /// Serve the feed for `role`.
    Allowed {
        /// Role of the signed-in user.
        role: Role,
    },
    /// Send the user elsewhere.
    Redirect(Navigation),
}

/// Result of a feed re-validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedReport {
    /// Access decision.
    pub access: FeedAccess,
    /// Billing state observed, `Unknown` when not checked.
    pub subscription: SubscriptionState,
    /// Session found, if any.
    pub session: Option<Session>,
}

impl FeedReport {
    /// Reason for the decision; `Feed` when access is allowed.
    pub fn redirect_reason(&self) -> RedirectReason {
        match &self.access {
            FeedAccess::Allowed { .. } => RedirectReason::Feed,
            FeedAccess::Redirect(navigation) => navigation.reason(),
        }
    }
}

/// Guards the feed entry point.
#[derive(Clone)]
pub struct FeedGuard {
    identity: Arc<dyn IdentityProvider>,
    gate: ProfileGate,
    subscriptions: Arc<dyn SubscriptionStatusQuery>,
    dispatcher: RouteDispatcher,
}

impl FeedGuard {
    /// Compose the guard.
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        gate: ProfileGate,
        subscriptions: Arc<dyn SubscriptionStatusQuery>,
        dispatcher: RouteDispatcher,
    ) -> Self {
        Self {
            identity,
            gate,
            subscriptions,
            dispatcher,
        }
    }

    /// Re-check everything the feed depends on for `client`.
    pub async fn revalidate(&self, client: &ClientContext, debug: bool) -> FeedReport {
        let session = match self.identity.current_session(client).await {
            Ok(Some(session)) => session,
            Ok(None) => return self.bounce_to_login(RedirectReason::NoSession, debug),
            Err(error) => {
                warn!(%error, "feed session check failed");
                return self.bounce_to_login(RedirectReason::AuthFailed, debug);
            }
        };

        let profile = self.gate.load(&session).await;
        let role = match profile {
            Some(profile) if profile.is_onboarded() => profile.role(),
            _ => None,
        };
        let Some(role) = role else {
            return self.redirect(
                self.dispatcher
                    .navigation_for(&GateDecision::NeedsOnboarding, debug),
                SubscriptionState::Unknown,
                session,
            );
        };
        if role == Role::Journalist {
            return self.redirect(
                self.dispatcher
                    .navigation_for(&GateDecision::JournalistDashboard, debug),
                SubscriptionState::Unknown,
                session,
            );
        }

        let subscription = match self.subscriptions.fetch_status(&session).await {
            Ok(status) => classify_status(status.as_deref()),
            Err(error) => {
                warn!(%error, "subscription status lookup failed");
                SubscriptionState::Error
            }
        };
        flow_event!(
            debug,
            user = %session.user_id().short_form(),
            %role,
            %subscription,
            "feed access checked"
        );
        if subscription.is_active() {
            FeedReport {
                access: FeedAccess::Allowed { role },
                subscription,
                session: Some(session),
            }
        } else {
            self.redirect(
                self.dispatcher.plan_selection_navigation(debug),
                subscription,
                session,
            )
        }
    }

    fn bounce_to_login(&self, reason: RedirectReason, debug: bool) -> FeedReport {
        FeedReport {
            access: FeedAccess::Redirect(self.dispatcher.login_navigation(reason, debug)),
            subscription: SubscriptionState::Unknown,
            session: None,
        }
    }

    fn redirect(
        &self,
        navigation: Navigation,
        subscription: SubscriptionState,
        session: Session,
    ) -> FeedReport {
        FeedReport {
            access: FeedAccess::Redirect(navigation),
            subscription,
            session: Some(session),
        }
    }
}
