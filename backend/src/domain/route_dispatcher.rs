//! Turns gate decisions into the request's single hard navigation.

use tracing::warn;

use super::ports::{Navigator, NavigatorError};
use super::{Destinations, GateDecision, Navigation, RedirectReason};

/// Maps decisions to destinations and issues them through a [`Navigator`].
#[derive(Debug, Clone, Default)]
pub struct RouteDispatcher {
    destinations: Destinations,
}

impl RouteDispatcher {
    /// Dispatcher over `destinations`.
    pub fn new(destinations: Destinations) -> Self {
        Self { destinations }
    }

    /// Configured destinations.
    pub fn destinations(&self) -> &Destinations {
        &self.destinations
    }

    /// Navigation implied by `decision`.
    ///
    /// A `next` override is used verbatim; role destinations keep `debug=1`
    /// when diagnostics are on.
    pub fn navigation_for(&self, decision: &GateDecision, debug: bool) -> Navigation {
        let reason = decision.redirect_reason();
        let target = match decision {
            GateDecision::NextParamOverride(next) => {
                return Navigation::new(next.as_str(), reason);
            }
            GateDecision::NeedsOnboarding => &self.destinations.onboarding,
            GateDecision::JournalistDashboard => &self.destinations.journalist_dashboard,
            GateDecision::GeneralFeed => &self.destinations.feed,
        };
        Navigation::new(target.as_str(), reason).preserve_debug(debug)
    }

    /// Navigation back to the login page.
    pub fn login_navigation(&self, reason: RedirectReason, debug: bool) -> Navigation {
        Navigation::new(self.destinations.login.as_str(), reason).preserve_debug(debug)
    }

    /// Navigation to plan selection for accounts without an active plan.
    pub fn plan_selection_navigation(&self, debug: bool) -> Navigation {
        Navigation::new(
            self.destinations.plan_selection.as_str(),
            RedirectReason::Onboarding,
        )
        .preserve_debug(debug)
    }

    /// Hand `navigation` to `navigator`, returning what was issued.
    pub fn dispatch(
        &self,
        navigator: &dyn Navigator,
        navigation: Navigation,
    ) -> Result<Navigation, NavigatorError> {
        navigator.navigate(navigation.clone()).inspect_err(|error| {
            warn!(
                %error,
                target = navigation.target(),
                reason = %navigation.reason(),
                "navigation suppressed"
            );
        })?;
        Ok(navigation)
    }
}
