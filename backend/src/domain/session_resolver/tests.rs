//! Ordering, deadline, and retry behaviour of the session resolver.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{FlowId, IdentityProviderError, MockIdentityProvider, OneShotNavigator};
use crate::domain::{AccessToken, AuthEvent, AuthFlow, ProfileGate, RouteDispatcher};
use crate::test_support::{ScriptedIdentity, ScriptedProfiles, session_for};

const USER: &str = "9b2c4d6e-0000-4000-8000-000000000001";

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// The paused clock lands on timer ticks, which are millisecond aligned.
fn assert_elapsed(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual < expected + ms(1),
        "elapsed {actual:?}, expected {expected:?}"
    );
}

#[fixture]
fn client() -> ClientContext {
    ClientContext::new(FlowId::generate())
}

fn resolver(identity: Arc<ScriptedIdentity>) -> SessionResolver {
    SessionResolver::new(identity, ResolverTimings::default())
}

fn callback_with_code(client: ClientContext) -> ResolutionRequest {
    ResolutionRequest::callback(CallbackParams::default().with_code("abc123"), client)
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn successful_exchange_confirms_session(client: ClientContext) {
    let identity = Arc::new(
        ScriptedIdentity::new().exchange_after(ms(120), Ok(session_for(USER))),
    );
    let resolution = resolver(Arc::clone(&identity))
        .resolve(&callback_with_code(client))
        .await;

    assert_eq!(
        resolution.outcome,
        ResolutionOutcome::Confirmed(session_for(USER))
    );
    assert_eq!(resolution.settled_by, Some(SignalName::CodeExchange));
    assert_elapsed(resolution.elapsed, ms(120));
    assert_eq!(identity.exchange_calls(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn existing_session_beats_slower_exchange(client: ClientContext) {
    let identity = Arc::new(
        ScriptedIdentity::new()
            .session_after(ms(10), Ok(Some(session_for(USER))))
            .exchange_after(ms(400), Ok(session_for(USER))),
    );
    let resolution = resolver(identity).resolve(&callback_with_code(client)).await;

    assert_eq!(resolution.settled_by, Some(SignalName::ExistingSession));
    assert!(matches!(resolution.outcome, ResolutionOutcome::Confirmed(_)));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn failed_exchange_retries_once_and_finds_twin_session(client: ClientContext) {
    let identity = Arc::new(
        ScriptedIdentity::new()
            // existing-session check
            .session_after(ms(5), Ok(None))
            // fallback probe after the exchange failure
            .session_after(ms(5), Ok(Some(session_for(USER))))
            .exchange_after(ms(50), Err(IdentityProviderError::rejected("code already used"))),
    );
    let resolution = resolver(Arc::clone(&identity))
        .resolve(&callback_with_code(client))
        .await;

    assert_eq!(
        resolution.outcome,
        ResolutionOutcome::Confirmed(session_for(USER))
    );
    assert_eq!(resolution.settled_by, Some(SignalName::CodeExchange));
    assert_eq!(identity.exchange_calls(), 1);
    assert_eq!(identity.session_calls(), 2);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn failed_exchange_without_session_is_terminal(client: ClientContext) {
    let identity = Arc::new(
        ScriptedIdentity::new()
            .exchange_after(ms(50), Err(IdentityProviderError::rejected("invalid grant"))),
    );
    let resolution = resolver(Arc::clone(&identity))
        .resolve(&callback_with_code(client))
        .await;

    assert_eq!(
        resolution.outcome,
        ResolutionOutcome::Failed(ResolutionFailure::ExchangeFailed)
    );
    assert_eq!(identity.exchange_calls(), 1);
    assert_eq!(identity.session_calls(), 2, "one check plus exactly one retry");
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn empty_callback_fails_after_grace_period(client: ClientContext) {
    let identity = Arc::new(ScriptedIdentity::new());
    let request = ResolutionRequest::callback(CallbackParams::default(), client);
    let resolution = resolver(identity).resolve(&request).await;

    assert_eq!(
        resolution.outcome,
        ResolutionOutcome::Failed(ResolutionFailure::ExchangeFailed)
    );
    assert_eq!(resolution.settled_by, Some(SignalName::GraceProbe));
    assert_elapsed(resolution.elapsed, ResolverTimings::default().hash_grace);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn hash_tokens_are_rechecked_after_grace(client: ClientContext) {
    let identity = Arc::new(
        ScriptedIdentity::new()
            .session_after(ms(0), Ok(None))
            .session_after(ms(0), Ok(Some(session_for(USER)))),
    );
    let tokens = HashTokens::new(
        AccessToken::new("fragment-token").expect("token"),
        AccessToken::new("fragment-refresh"),
    );
    let request = ResolutionRequest::callback(
        CallbackParams::default().with_hash_tokens(tokens),
        client,
    );
    let resolution = resolver(Arc::clone(&identity)).resolve(&request).await;

    assert_eq!(resolution.settled_by, Some(SignalName::HashTokenWait));
    assert_elapsed(resolution.elapsed, ms(500));
    let ResolutionOutcome::Confirmed(session) = resolution.outcome else {
        panic!("expected confirmed session");
    };
    assert_eq!(
        session.refresh_token().map(AccessToken::expose),
        Some("fragment-refresh")
    );
    assert_eq!(
        identity.seen_tokens().last().cloned().flatten().as_deref(),
        Some("fragment-token")
    );
}

/// Existing-session, exchange and listener delays; each signal confirms its
/// own user so the winner is visible in the session.
#[rstest]
#[case::existing_session_first(10, 20, 30, SignalName::ExistingSession, "existing-user")]
#[case::exchange_first(30, 10, 20, SignalName::CodeExchange, "exchange-user")]
#[case::listener_first(20, 30, 10, SignalName::Listener, "listener-user")]
#[case::listener_before_exchange(30, 20, 10, SignalName::Listener, "listener-user")]
#[case::three_way_tie(10, 10, 10, SignalName::ExistingSession, "existing-user")]
#[tokio::test(start_paused = true)]
async fn first_signal_settles_once_for_every_ordering(
    client: ClientContext,
    #[case] existing_ms: u64,
    #[case] exchange_ms: u64,
    #[case] listener_ms: u64,
    #[case] winner: SignalName,
    #[case] winning_user: &str,
) {
    let identity = Arc::new(
        ScriptedIdentity::new()
            .session_after(ms(existing_ms), Ok(Some(session_for("existing-user"))))
            .exchange_after(ms(exchange_ms), Ok(session_for("exchange-user")))
            .event_after(
                ms(listener_ms),
                AuthEvent::signed_in(session_for("listener-user")),
            ),
    );
    let flow = AuthFlow::new(
        resolver(identity),
        ProfileGate::new(Arc::new(ScriptedProfiles::new())),
        RouteDispatcher::default(),
    );
    let navigator = OneShotNavigator::new();

    let report = flow.run(&callback_with_code(client), &navigator).await;
    tokio::time::sleep(ms(100)).await;

    assert_eq!(report.settled_by, Some(winner));
    assert_eq!(report.session, Some(session_for(winning_user)));
    assert_elapsed(report.elapsed, ms(10));
    assert_eq!(navigator.attempts(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn unhonoured_hash_tokens_defer_to_listener(client: ClientContext) {
    let identity = Arc::new(
        ScriptedIdentity::new().event_after(ms(900), AuthEvent::signed_in(session_for(USER))),
    );
    let tokens = HashTokens::new(AccessToken::new("fragment-token").expect("token"), None);
    let request = ResolutionRequest::callback(
        CallbackParams::default().with_hash_tokens(tokens),
        client,
    );
    let resolution = resolver(identity).resolve(&request).await;

    assert_eq!(resolution.settled_by, Some(SignalName::Listener));
    assert_elapsed(resolution.elapsed, ms(900));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn listener_ignores_events_without_session(client: ClientContext) {
    let identity = Arc::new(
        ScriptedIdentity::new()
            .exchange_after(ms(5_000), Ok(session_for(USER)))
            .event_after(ms(100), AuthEvent::signed_out())
            .event_after(ms(200), AuthEvent::token_refreshed(session_for(USER))),
    );
    let resolution = resolver(identity).resolve(&callback_with_code(client)).await;

    assert_eq!(resolution.settled_by, Some(SignalName::Listener));
    assert_elapsed(resolution.elapsed, ms(200));
}

#[rstest]
#[case(ms(7_999), Some(SignalName::CodeExchange))]
#[case(ms(8_000), None)]
#[case(ms(9_000), None)]
#[tokio::test(start_paused = true)]
async fn timeout_dominates_late_signals(
    client: ClientContext,
    #[case] exchange_delay: Duration,
    #[case] expected_winner: Option<SignalName>,
) {
    let identity = Arc::new(
        ScriptedIdentity::new().exchange_after(exchange_delay, Ok(session_for(USER))),
    );
    let resolution = resolver(identity).resolve(&callback_with_code(client)).await;

    assert_eq!(resolution.settled_by, expected_winner);
    if expected_winner.is_none() {
        assert_eq!(
            resolution.outcome,
            ResolutionOutcome::Failed(ResolutionFailure::Timeout)
        );
        assert_elapsed(resolution.elapsed, ms(8_000));
    }
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn listener_subscription_is_released_after_settlement(client: ClientContext) {
    let identity = Arc::new(
        ScriptedIdentity::new().exchange_after(ms(10), Ok(session_for(USER))),
    );
    let resolution = resolver(Arc::clone(&identity))
        .resolve(&callback_with_code(client))
        .await;

    assert!(matches!(resolution.outcome, ResolutionOutcome::Confirmed(_)));
    assert_eq!(identity.live_subscriptions(), 0);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn dropping_resolution_releases_listener(client: ClientContext) {
    let identity = Arc::new(
        ScriptedIdentity::new().exchange_after(ms(5_000), Ok(session_for(USER))),
    );
    let resolver = resolver(Arc::clone(&identity));
    let request = callback_with_code(client);
    let cut_short = tokio::time::timeout(ms(100), resolver.resolve(&request)).await;

    assert!(cut_short.is_err());
    assert_eq!(identity.live_subscriptions(), 0);
}

#[rstest]
#[case(Ok(None), ResolutionOutcome::NoSession)]
#[case(
    Err(IdentityProviderError::transport("connection reset")),
    ResolutionOutcome::Failed(ResolutionFailure::AuthFailed)
)]
#[tokio::test(start_paused = true)]
async fn hydration_settles_on_first_session_check(
    client: ClientContext,
    #[case] answer: Result<Option<Session>, IdentityProviderError>,
    #[case] expected: ResolutionOutcome,
) {
    let mut identity = MockIdentityProvider::new();
    identity
        .expect_subscribe()
        .times(1)
        .returning(|_| stream::pending().boxed());
    identity
        .expect_current_session()
        .times(1)
        .return_once(move |_| answer);
    identity.expect_exchange_code_for_session().never();

    let resolver = SessionResolver::new(Arc::new(identity), ResolverTimings::default());
    let request = ResolutionRequest::hydration(CallbackParams::default(), client);
    let resolution = resolver.resolve(&request).await;

    assert_eq!(resolution.outcome, expected);
    assert_eq!(resolution.settled_by, Some(SignalName::ExistingSession));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn hydration_times_out_with_its_own_deadline(client: ClientContext) {
    let identity = Arc::new(ScriptedIdentity::new().session_after(ms(3_000), Ok(None)));
    let request = ResolutionRequest::hydration(CallbackParams::default(), client);
    let resolution = resolver(identity).resolve(&request).await;

    assert_eq!(
        resolution.outcome,
        ResolutionOutcome::Failed(ResolutionFailure::Timeout)
    );
    assert_elapsed(resolution.elapsed, ms(1_500));
}

#[rstest]
fn failures_map_to_redirect_reasons() {
    assert_eq!(
        ResolutionFailure::ExchangeFailed.redirect_reason(),
        RedirectReason::ExchangeFailed
    );
    assert_eq!(ResolutionFailure::Timeout.redirect_reason(), RedirectReason::Timeout);
    assert_eq!(
        ResolutionFailure::AuthFailed.redirect_reason(),
        RedirectReason::AuthFailed
    );
}
