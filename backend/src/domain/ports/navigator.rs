//! Driving-side port through which the flow performs its single navigation.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::{Navigation, Settlement};

use super::define_port_error;

define_port_error! {
    /// Errors raised when issuing a navigation.
    pub enum NavigatorError {
        /// A navigation was already issued for this request.
        AlreadyNavigated => "navigation already issued",
        /// The page or request went away before the navigation was issued.
        Detached => "navigator detached",
    }
}

/// Issues full-document navigations.
#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send + Sync {
    /// Perform `navigation`; implementations accept at most one per request.
    fn navigate(&self, navigation: Navigation) -> Result<(), NavigatorError>;
}

/// Navigator that records the first navigation and refuses the rest.
///
/// Inbound adapters create one per request and render the recorded
/// navigation as a hard redirect.
#[derive(Debug, Default)]
pub struct OneShotNavigator {
    recorded: Settlement<Navigation>,
    attempts: AtomicUsize,
}

impl OneShotNavigator {
    /// Empty navigator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigation issued, if any.
    pub fn navigation(&self) -> Option<&Navigation> {
        self.recorded.get()
    }

    /// Number of navigate calls, accepted or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Navigator for OneShotNavigator {
    fn navigate(&self, navigation: Navigation) -> Result<(), NavigatorError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.recorded
            .settle(navigation)
            .map_err(|_| NavigatorError::already_navigated())
    }
}
