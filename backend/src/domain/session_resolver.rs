//! Session resolution for sign-in callbacks and the login page.
//!
//! A resolution run starts several independent signals and settles on the
//! first conclusive one, under a hard deadline:
//!
//! 1. existing-session check against the identity provider;
//! 2. authorisation code exchange, with one fallback session probe when the
//!    exchange fails (the code may already have been spent by a duplicate
//!    request that succeeded);
//! 3. hash-token wait: after a short grace period, re-check the session
//!    using the fragment tokens, otherwise defer to the listener;
//! 4. auth-state-change listener, settling on `SIGNED_IN` or
//!    `TOKEN_REFRESHED` carrying a session.
//!
//! In callback mode a request with neither code nor fragment tokens probes
//! once after the grace period and fails with `exchange_failed` if no
//! session turned up. Hydration mode (login page) only runs signals 1 and 4.
//!
//! Dropping the future returned by [`SessionResolver::resolve`] cancels the
//! deadline timer and every in-flight signal, including the listener
//! subscription.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Serialize;
use tokio::time::{Instant, sleep};
use tracing::warn;
use utoipa::ToSchema;

use super::flow_log::flow_event;
use super::ports::{AuthEventStream, ClientContext, IdentityProvider};
use super::race::{RaceOutcome, Signal, SignalVerdict, first_resolved};
use super::{CallbackParams, HashTokens, RedirectReason, Session};

/// Deadlines and grace periods for a resolution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverTimings {
    /// Hard deadline for sign-in callbacks.
    pub callback_timeout: Duration,
    /// Hard deadline for login page hydration.
    pub hydration_timeout: Duration,
    /// Wait before re-checking when the callback carried no code.
    pub hash_grace: Duration,
}

impl Default for ResolverTimings {
    fn default() -> Self {
        Self {
            callback_timeout: Duration::from_secs(8),
            hydration_timeout: Duration::from_millis(1_500),
            hash_grace: Duration::from_millis(500),
        }
    }
}

impl ResolverTimings {
    /// Deadline applicable to `mode`.
    pub fn timeout_for(&self, mode: ResolutionMode) -> Duration {
        match mode {
            ResolutionMode::Callback => self.callback_timeout,
            ResolutionMode::Hydration => self.hydration_timeout,
        }
    }
}

/// Which entry point started the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Landing from the identity provider after sign-in.
    Callback,
    /// Login page checking whether the user is already signed in.
    Hydration,
}

/// Inputs for one resolution run.
#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    mode: ResolutionMode,
    params: CallbackParams,
    client: ClientContext,
}

impl ResolutionRequest {
    /// Build a request for `mode`.
    pub fn new(mode: ResolutionMode, params: CallbackParams, client: ClientContext) -> Self {
        Self {
            mode,
            params,
            client,
        }
    }

    /// Callback-mode request.
    pub fn callback(params: CallbackParams, client: ClientContext) -> Self {
        Self::new(ResolutionMode::Callback, params, client)
    }

    /// Hydration-mode request.
    pub fn hydration(params: CallbackParams, client: ClientContext) -> Self {
        Self::new(ResolutionMode::Hydration, params, client)
    }

    /// Entry point.
    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    /// Parsed URL parameters.
    pub fn params(&self) -> &CallbackParams {
        &self.params
    }

    /// Client-held provider state.
    pub fn client(&self) -> &ClientContext {
        &self.client
    }
}

/// Signal that settled a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignalName {
    /// Existing-session check.
    ExistingSession,
    /// Authorisation code exchange (including its fallback probe).
    CodeExchange,
    /// Fragment token re-check after the grace period.
    HashTokenWait,
    /// Grace-period probe for callbacks without code or tokens.
    GraceProbe,
    /// Auth-state-change listener.
    Listener,
}

impl SignalName {
    /// Stable `snake_case` name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExistingSession => "existing_session",
            Self::CodeExchange => "code_exchange",
            Self::HashTokenWait => "hash_token_wait",
            Self::GraceProbe => "grace_probe",
            Self::Listener => "listener",
        }
    }
}

impl fmt::Display for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionFailure {
    /// Code rejected and no session found by the fallback probe.
    ExchangeFailed,
    /// Deadline passed before any signal settled.
    Timeout,
    /// Provider failed while checking the session.
    AuthFailed,
}

impl ResolutionFailure {
    /// Diagnostic reason recorded for this failure.
    pub fn redirect_reason(self) -> RedirectReason {
        match self {
            Self::ExchangeFailed => RedirectReason::ExchangeFailed,
            Self::Timeout => RedirectReason::Timeout,
            Self::AuthFailed => RedirectReason::AuthFailed,
        }
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// A session is established.
    Confirmed(Session),
    /// Definitely signed out.
    NoSession,
    /// The run failed.
    Failed(ResolutionFailure),
}

/// Terminal state plus the diagnostics gathered on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Terminal state.
    pub outcome: ResolutionOutcome,
    /// Winning signal; `None` on timeout or when every signal abstained.
    pub settled_by: Option<SignalName>,
    /// Time from start to settlement.
    pub elapsed: Duration,
}

/// Single retry used after a failed code exchange or an empty callback.
///
/// Consumed by [`FallbackProbe::run`], so a run can probe at most once per
/// signal.
struct FallbackProbe<'a> {
    identity: &'a dyn IdentityProvider,
    client: &'a ClientContext,
    debug: bool,
}

impl<'a> FallbackProbe<'a> {
    fn new(identity: &'a dyn IdentityProvider, client: &'a ClientContext, debug: bool) -> Self {
        Self {
            identity,
            client,
            debug,
        }
    }

    async fn run(self) -> Option<Session> {
        match self.identity.current_session(self.client).await {
            Ok(session) => {
                flow_event!(self.debug, found = session.is_some(), "fallback session probe finished");
                session
            }
            Err(error) => {
                warn!(%error, "fallback session probe failed");
                None
            }
        }
    }
}

type ResolverSignal<'a> = Signal<'a, SignalName, ResolutionOutcome>;

/// Resolves the session for one request.
#[derive(Clone)]
pub struct SessionResolver {
    identity: Arc<dyn IdentityProvider>,
    timings: ResolverTimings,
}

impl SessionResolver {
    /// Build a resolver over `identity`.
    pub fn new(identity: Arc<dyn IdentityProvider>, timings: ResolverTimings) -> Self {
        Self { identity, timings }
    }

    /// Configured timings.
    pub fn timings(&self) -> ResolverTimings {
        self.timings
    }

    /// Run every applicable signal and return the first terminal state.
    pub async fn resolve(&self, request: &ResolutionRequest) -> Resolution {
        let started = Instant::now();
        let debug = request.params().debug();
        let mode = request.mode();
        let deadline = started + self.timings.timeout_for(mode);

        // Subscribe before any provider call so no event slips between them.
        let events = self.identity.subscribe(request.client());
        let signals = self.signals(request, events);
        flow_event!(
            debug,
            flow_id = %request.client().flow_id(),
            ?mode,
            signals = signals.len(),
            "session resolution started"
        );

        let (outcome, settled_by) = match first_resolved(signals, deadline).await {
            RaceOutcome::Settled { by, value } => (value, Some(by)),
            RaceOutcome::Exhausted => (ResolutionOutcome::NoSession, None),
            RaceOutcome::TimedOut => (ResolutionOutcome::Failed(ResolutionFailure::Timeout), None),
        };
        let elapsed = started.elapsed();

        match &outcome {
            ResolutionOutcome::Failed(failure) => warn!(
                flow_id = %request.client().flow_id(),
                reason = %failure.redirect_reason(),
                elapsed_ms = elapsed.as_millis(),
                "session resolution failed"
            ),
            ResolutionOutcome::Confirmed(session) => flow_event!(
                debug,
                user = %session.user_id().short_form(),
                settled_by = settled_by.map(SignalName::as_str),
                elapsed_ms = elapsed.as_millis(),
                "session confirmed"
            ),
            ResolutionOutcome::NoSession => flow_event!(
                debug,
                settled_by = settled_by.map(SignalName::as_str),
                elapsed_ms = elapsed.as_millis(),
                "no session"
            ),
        }

        Resolution {
            outcome,
            settled_by,
            elapsed,
        }
    }

    fn signals<'a>(
        &'a self,
        request: &'a ResolutionRequest,
        events: AuthEventStream,
    ) -> Vec<ResolverSignal<'a>> {
        let mut signals = vec![self.existing_session(request)];
        if request.mode() == ResolutionMode::Callback {
            let params = request.params();
            match (params.code(), params.hash_tokens()) {
                (Some(code), _) => signals.push(self.code_exchange(request, code)),
                (None, Some(tokens)) => signals.push(self.hash_token_wait(request, tokens)),
                (None, None) => signals.push(self.grace_probe(request)),
            }
        }
        signals.push(listener(events, request.params().debug()));
        signals
    }

    fn existing_session<'a>(&'a self, request: &'a ResolutionRequest) -> ResolverSignal<'a> {
        let identity = self.identity.as_ref();
        Signal::new(SignalName::ExistingSession, async move {
            let hydrating = request.mode() == ResolutionMode::Hydration;
            match identity.current_session(request.client()).await {
                Ok(Some(session)) => SignalVerdict::Settle(ResolutionOutcome::Confirmed(session)),
                Ok(None) if hydrating => SignalVerdict::Settle(ResolutionOutcome::NoSession),
                Ok(None) => SignalVerdict::Abstain,
                Err(error) => {
                    warn!(%error, "existing session check failed");
                    if hydrating {
                        SignalVerdict::Settle(ResolutionOutcome::Failed(
                            ResolutionFailure::AuthFailed,
                        ))
                    } else {
                        SignalVerdict::Abstain
                    }
                }
            }
        })
    }

    fn code_exchange<'a>(
        &'a self,
        request: &'a ResolutionRequest,
        code: &'a str,
    ) -> ResolverSignal<'a> {
        let identity = self.identity.as_ref();
        let debug = request.params().debug();
        Signal::new(SignalName::CodeExchange, async move {
            match identity
                .exchange_code_for_session(request.client(), code)
                .await
            {
                Ok(session) => SignalVerdict::Settle(ResolutionOutcome::Confirmed(session)),
                Err(error) => {
                    warn!(%error, "code exchange failed; probing for an existing session");
                    let probe = FallbackProbe::new(identity, request.client(), debug);
                    SignalVerdict::Settle(match probe.run().await {
                        Some(session) => ResolutionOutcome::Confirmed(session),
                        None => ResolutionOutcome::Failed(ResolutionFailure::ExchangeFailed),
                    })
                }
            }
        })
    }

    fn hash_token_wait<'a>(
        &'a self,
        request: &'a ResolutionRequest,
        tokens: &'a HashTokens,
    ) -> ResolverSignal<'a> {
        let identity = self.identity.as_ref();
        let grace = self.timings.hash_grace;
        let debug = request.params().debug();
        Signal::new(SignalName::HashTokenWait, async move {
            sleep(grace).await;
            let client = request
                .client()
                .clone()
                .with_access_token(Some(tokens.access_token().clone()));
            match identity.current_session(&client).await {
                Ok(Some(session)) => {
                    let session = if session.refresh_token().is_none() {
                        session.with_refresh_token(tokens.refresh_token().cloned())
                    } else {
                        session
                    };
                    SignalVerdict::Settle(ResolutionOutcome::Confirmed(session))
                }
                Ok(None) => {
                    flow_event!(debug, "fragment tokens not yet honoured; deferring to listener");
                    SignalVerdict::Abstain
                }
                Err(error) => {
                    warn!(%error, "fragment token check failed; deferring to listener");
                    SignalVerdict::Abstain
                }
            }
        })
    }

    fn grace_probe<'a>(&'a self, request: &'a ResolutionRequest) -> ResolverSignal<'a> {
        let identity = self.identity.as_ref();
        let grace = self.timings.hash_grace;
        let debug = request.params().debug();
        Signal::new(SignalName::GraceProbe, async move {
            sleep(grace).await;
            let probe = FallbackProbe::new(identity, request.client(), debug);
            SignalVerdict::Settle(match probe.run().await {
                Some(session) => ResolutionOutcome::Confirmed(session),
                None => ResolutionOutcome::Failed(ResolutionFailure::ExchangeFailed),
            })
        })
    }
}

fn listener<'a>(mut events: AuthEventStream, debug: bool) -> ResolverSignal<'a> {
    Signal::new(SignalName::Listener, async move {
        while let Some(event) = events.next().await {
            let kind = event.kind();
            match event.into_confirmed_session() {
                Some(session) => {
                    flow_event!(debug, %kind, "auth state change confirmed session");
                    return SignalVerdict::Settle(ResolutionOutcome::Confirmed(session));
                }
                None => flow_event!(debug, %kind, "auth state change ignored"),
            }
        }
        SignalVerdict::Abstain
    })
}

#[cfg(test)]
mod tests;
