//! One sign-in attempt end to end: resolve, classify, navigate.
//!
//! [`AuthFlow::run`] drives the pipeline inline for a request handler.
//! [`AuthFlow::spawn`] runs it on its own task and returns a [`FlowHandle`];
//! tearing the handle down (or dropping it) before settlement cancels the
//! deadline, releases the listener, and guarantees no navigation happens.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tracing::trace;

use super::flow_log::flow_event;
use super::ports::{Navigator, NavigatorError};
use super::{
    Navigation, ProfileGate, RedirectReason, Resolution, ResolutionFailure, ResolutionMode,
    ResolutionOutcome, ResolutionRequest, RouteDispatcher, Session, SessionResolver, SignalName,
};

/// The single recovery offered with a visible failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryAction {
    /// Button label.
    pub label: &'static str,
    /// Where the button leads.
    pub href: String,
}

/// User-visible failure of a sign-in attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowFailure {
    /// What went wrong.
    pub reason: ResolutionFailure,
    /// Plain-language explanation without diagnostics.
    pub message: &'static str,
    /// The one action offered to the user.
    pub recovery: RecoveryAction,
}

impl FlowFailure {
    /// Failure for `reason`, recovering through `login`.
    pub fn new(reason: ResolutionFailure, login: &str) -> Self {
        let message = match reason {
            ResolutionFailure::ExchangeFailed => {
                "This sign-in link is invalid or has already been used."
            }
            ResolutionFailure::Timeout => "Signing in took too long.",
            ResolutionFailure::AuthFailed => "We could not confirm your sign-in.",
        };
        Self {
            reason,
            message,
            recovery: RecoveryAction {
                label: "Request a new link",
                href: login.to_owned(),
            },
        }
    }
}

/// What the attempt ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// A navigation was issued.
    Navigated(Navigation),
    /// Login page with no session; nothing to do.
    SignedOut,
    /// Visible failure with a recovery action.
    Failed(FlowFailure),
    /// The navigator refused (already navigated or detached).
    Suppressed(NavigatorError),
}

/// Outcome plus diagnostics for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowReport {
    /// Terminal outcome.
    pub outcome: FlowOutcome,
    /// Signal that settled resolution.
    pub settled_by: Option<SignalName>,
    /// Resolution time.
    pub elapsed: Duration,
    /// Confirmed session, if any.
    pub session: Option<Session>,
}

impl FlowReport {
    /// Reason explaining the branch that fired.
    pub fn redirect_reason(&self) -> RedirectReason {
        match &self.outcome {
            FlowOutcome::Navigated(navigation) => navigation.reason(),
            FlowOutcome::SignedOut => RedirectReason::NoSession,
            FlowOutcome::Failed(failure) => failure.reason.redirect_reason(),
            FlowOutcome::Suppressed(_) => RedirectReason::None,
        }
    }
}

/// Resolver, gate, and dispatcher composed for one entry point.
#[derive(Clone)]
pub struct AuthFlow {
    resolver: SessionResolver,
    gate: ProfileGate,
    dispatcher: RouteDispatcher,
}

impl AuthFlow {
    /// Compose the pipeline.
    pub fn new(resolver: SessionResolver, gate: ProfileGate, dispatcher: RouteDispatcher) -> Self {
        Self {
            resolver,
            gate,
            dispatcher,
        }
    }

    /// Dispatcher used for navigations.
    pub fn dispatcher(&self) -> &RouteDispatcher {
        &self.dispatcher
    }

    /// Resolve the session for `request` and act on it through `navigator`.
    pub async fn run(&self, request: &ResolutionRequest, navigator: &dyn Navigator) -> FlowReport {
        let debug = request.params().debug();
        let Resolution {
            outcome,
            settled_by,
            elapsed,
        } = self.resolver.resolve(request).await;

        let (outcome, session) = match outcome {
            ResolutionOutcome::Confirmed(session) => {
                let decision = self
                    .gate
                    .classify(&session, request.params().next(), debug)
                    .await;
                let navigation = self.dispatcher.navigation_for(&decision, debug);
                (self.navigate(navigator, navigation), Some(session))
            }
            ResolutionOutcome::NoSession => match request.mode() {
                ResolutionMode::Callback => {
                    let navigation = self
                        .dispatcher
                        .login_navigation(RedirectReason::NoSession, debug);
                    (self.navigate(navigator, navigation), None)
                }
                ResolutionMode::Hydration => (FlowOutcome::SignedOut, None),
            },
            ResolutionOutcome::Failed(reason) => (
                FlowOutcome::Failed(FlowFailure::new(
                    reason,
                    &self.dispatcher.destinations().login,
                )),
                None,
            ),
        };

        let report = FlowReport {
            outcome,
            settled_by,
            elapsed,
            session,
        };
        flow_event!(
            debug,
            flow_id = %request.client().flow_id(),
            reason = %report.redirect_reason(),
            "auth flow finished"
        );
        report
    }

    fn navigate(&self, navigator: &dyn Navigator, navigation: Navigation) -> FlowOutcome {
        match self.dispatcher.dispatch(navigator, navigation) {
            Ok(issued) => FlowOutcome::Navigated(issued),
            Err(error) => FlowOutcome::Suppressed(error),
        }
    }

    /// Run the pipeline on its own task.
    pub fn spawn(
        self: Arc<Self>,
        request: ResolutionRequest,
        navigator: Arc<dyn Navigator>,
    ) -> FlowHandle {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel_rx => {
                    flow_event!(
                        request.params().debug(),
                        flow_id = %request.client().flow_id(),
                        "auth flow torn down before settlement"
                    );
                    None
                }
                report = self.run(&request, navigator.as_ref()) => Some(report),
            }
        });
        FlowHandle {
            cancel: Some(cancel_tx),
            task,
        }
    }
}

/// Handle to a spawned attempt.
///
/// Dropping the handle tears the attempt down.
#[derive(Debug)]
pub struct FlowHandle {
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<Option<FlowReport>>,
}

impl FlowHandle {
    /// Cancel the attempt unless it already settled.
    pub fn teardown(&mut self) {
        let Some(cancel) = self.cancel.take() else {
            return;
        };
        if cancel.send(()).is_err() {
            trace!("auth flow already finished before teardown");
        }
    }

    /// Whether the task has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the attempt; `None` when it was torn down first.
    pub async fn join(self) -> Result<Option<FlowReport>, JoinError> {
        let Self { cancel, task } = self;
        let report = task.await;
        drop(cancel);
        report
    }
}
