//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services and remain testable without I/O.

use std::sync::Arc;

use url::Url;

use crate::domain::ports::{IdentityProvider, ProfileStore, SubscriptionStatusQuery};
use crate::domain::{
    AuthFlow, Destinations, FeedGuard, ProfileGate, ResolverTimings, RouteDispatcher,
    SessionResolver, SignInService,
};

/// Parameter object bundling the port implementations the services need.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub identity: Arc<dyn IdentityProvider>,
    pub profiles: Arc<dyn ProfileStore>,
    pub subscriptions: Arc<dyn SubscriptionStatusQuery>,
}

/// Tunables shared by every auth entry point.
#[derive(Debug, Clone)]
pub struct FlowSettings {
    /// Resolver deadlines and grace period.
    pub timings: ResolverTimings,
    /// Navigation targets.
    pub destinations: Destinations,
    /// Public origin used to build callback URLs.
    pub site_url: Url,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub auth_flow: Arc<AuthFlow>,
    pub feed_guard: Arc<FeedGuard>,
    pub sign_in: Arc<SignInService>,
}

impl HttpState {
    /// Compose the domain services over `ports`.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use session_gate::domain::ports::{
    ///     FixtureIdentityProvider, FixtureProfileStore, FixtureSubscriptionStatusQuery,
    /// };
    /// use session_gate::domain::{Destinations, ResolverTimings};
    /// use session_gate::inbound::http::state::{FlowSettings, HttpState, HttpStatePorts};
    ///
    /// let state = HttpState::new(
    ///     HttpStatePorts {
    ///         identity: Arc::new(FixtureIdentityProvider),
    ///         profiles: Arc::new(FixtureProfileStore),
    ///         subscriptions: Arc::new(FixtureSubscriptionStatusQuery),
    ///     },
    ///     FlowSettings {
    ///         timings: ResolverTimings::default(),
    ///         destinations: Destinations::default(),
    ///         site_url: url::Url::parse("https://app.example.com").expect("site url"),
    ///     },
    /// );
    /// assert_eq!(state.auth_flow.dispatcher().destinations().login, "/auth");
    /// ```
    pub fn new(ports: HttpStatePorts, settings: FlowSettings) -> Self {
        let HttpStatePorts {
            identity,
            profiles,
            subscriptions,
        } = ports;
        let gate = ProfileGate::new(profiles);
        let dispatcher = RouteDispatcher::new(settings.destinations);
        let resolver = SessionResolver::new(Arc::clone(&identity), settings.timings);

        Self {
            auth_flow: Arc::new(AuthFlow::new(resolver, gate.clone(), dispatcher.clone())),
            feed_guard: Arc::new(FeedGuard::new(
                Arc::clone(&identity),
                gate,
                subscriptions,
                dispatcher,
            )),
            sign_in: Arc::new(SignInService::new(identity, settings.site_url)),
        }
    }
}
