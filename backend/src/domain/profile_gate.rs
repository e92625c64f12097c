//! Classifies a confirmed session into its post-sign-in destination.

use std::sync::Arc;

use tracing::warn;

use super::flow_log::flow_event;
use super::ports::ProfileStore;
use super::{NextPath, Profile, RedirectReason, Role, Session};

/// Where a signed-in user should go next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// No profile yet, or onboarding unfinished.
    NeedsOnboarding,
    /// Journalist home.
    JournalistDashboard,
    /// Shared founder/agency/admin feed.
    GeneralFeed,
    /// Caller-supplied path, already validated as same-origin.
    NextParamOverride(NextPath),
}

impl GateDecision {
    /// Diagnostic reason for this decision.
    pub fn redirect_reason(&self) -> RedirectReason {
        match self {
            Self::NeedsOnboarding => RedirectReason::Onboarding,
            Self::JournalistDashboard => RedirectReason::Journalist,
            Self::GeneralFeed => RedirectReason::Feed,
            Self::NextParamOverride(_) => RedirectReason::NextParam,
        }
    }
}

/// Pure decision over profile state; first match wins.
///
/// # Examples
/// ```
/// use session_gate::domain::{GateDecision, Profile, Role, decide};
///
/// let unfinished = Profile::new(Some(Role::Founder), false);
/// assert_eq!(decide(Some(&unfinished), None), GateDecision::NeedsOnboarding);
/// ```
pub fn decide(profile: Option<&Profile>, next: Option<&NextPath>) -> GateDecision {
    if let Some(next) = next {
        return GateDecision::NextParamOverride(next.clone());
    }
    match profile {
        None => GateDecision::NeedsOnboarding,
        Some(profile) if !profile.is_onboarded() => GateDecision::NeedsOnboarding,
        Some(profile) if profile.role() == Some(Role::Journalist) => {
            GateDecision::JournalistDashboard
        }
        Some(_) => GateDecision::GeneralFeed,
    }
}

/// Reads the profile for a session and applies [`decide`].
#[derive(Clone)]
pub struct ProfileGate {
    profiles: Arc<dyn ProfileStore>,
}

impl ProfileGate {
    /// Gate over `profiles`.
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    /// Classify `session`, honouring a validated `next` first.
    ///
    /// A failing profile read is logged and treated as "no profile".
    pub async fn classify(
        &self,
        session: &Session,
        next: Option<&NextPath>,
        debug: bool,
    ) -> GateDecision {
        if next.is_some() {
            return decide(None, next);
        }
        let profile = self.load(session).await;
        let decision = decide(profile.as_ref(), None);
        flow_event!(
            debug,
            user = %session.user_id().short_form(),
            role = profile.as_ref().and_then(Profile::role).map(Role::as_str),
            onboarded = profile.as_ref().is_some_and(Profile::is_onboarded),
            reason = %decision.redirect_reason(),
            "profile gate classified session"
        );
        decision
    }

    /// Profile for `session`, with read failures folded into `None`.
    pub async fn load(&self, session: &Session) -> Option<Profile> {
        match self
            .profiles
            .fetch_profile(session.user_id(), session.access_token())
            .await
        {
            Ok(profile) => profile,
            Err(error) => {
                warn!(
                    %error,
                    user = %session.user_id().short_form(),
                    "profile read failed; treating as missing"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockProfileStore, ProfileStoreError};
    use crate::test_support::session_for;
    use rstest::rstest;

    fn next(path: &str) -> NextPath {
        NextPath::parse(path).expect("valid next")
    }

    #[rstest]
    #[case(None, GateDecision::NeedsOnboarding)]
    #[case(Some(Profile::new(Some(Role::Founder), false)), GateDecision::NeedsOnboarding)]
    #[case(Some(Profile::new(Some(Role::Journalist), false)), GateDecision::NeedsOnboarding)]
    #[case(Some(Profile::new(None, true)), GateDecision::GeneralFeed)]
    #[case(Some(Profile::new(Some(Role::Journalist), true)), GateDecision::JournalistDashboard)]
    #[case(Some(Profile::new(Some(Role::Founder), true)), GateDecision::GeneralFeed)]
    #[case(Some(Profile::new(Some(Role::Agency), true)), GateDecision::GeneralFeed)]
    #[case(Some(Profile::new(Some(Role::Admin), true)), GateDecision::GeneralFeed)]
    fn decision_follows_profile_state(
        #[case] profile: Option<Profile>,
        #[case] expected: GateDecision,
    ) {
        assert_eq!(decide(profile.as_ref(), None), expected);
    }

    #[rstest]
    fn next_overrides_unfinished_onboarding() {
        let profile = Profile::new(Some(Role::Founder), false);
        let decision = decide(Some(&profile), Some(&next("/journalist/dashboard")));
        assert_eq!(
            decision,
            GateDecision::NextParamOverride(next("/journalist/dashboard"))
        );
        assert_eq!(decision.redirect_reason(), RedirectReason::NextParam);
    }

    #[rstest]
    #[tokio::test]
    async fn profile_read_failure_falls_through_to_onboarding() {
        let mut store = MockProfileStore::new();
        store
            .expect_fetch_profile()
            .times(1)
            .returning(|_, _| Err(ProfileStoreError::connection("database unavailable")));
        let gate = ProfileGate::new(Arc::new(store));

        let decision = gate.classify(&session_for("user-1"), None, false).await;
        assert_eq!(decision, GateDecision::NeedsOnboarding);
    }

    #[rstest]
    #[tokio::test]
    async fn next_skips_profile_read() {
        let mut store = MockProfileStore::new();
        store.expect_fetch_profile().never();
        let gate = ProfileGate::new(Arc::new(store));

        let decision = gate
            .classify(&session_for("user-1"), Some(&next("/feed/42")), true)
            .await;
        assert_eq!(decision, GateDecision::NextParamOverride(next("/feed/42")));
    }

    #[rstest]
    #[tokio::test]
    async fn journalist_profile_routes_to_dashboard() {
        let mut store = MockProfileStore::new();
        store
            .expect_fetch_profile()
            .withf(|user_id, _| user_id.as_ref() == "user-1")
            .returning(|_, _| Ok(Some(Profile::new(Some(Role::Journalist), true))));
        let gate = ProfileGate::new(Arc::new(store));

        let decision = gate.classify(&session_for("user-1"), None, false).await;
        assert_eq!(decision, GateDecision::JournalistDashboard);
    }
}
