//! Scripted port doubles for the session gate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`).
//! Each double replays a script of delayed answers on the tokio clock, so
//! tests can pin down signal orderings with `start_paused = true`.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use futures_util::StreamExt;
use futures_util::stream;
use mockable::Clock;
use tokio::time::{Instant, sleep, sleep_until};
use url::Url;

use crate::domain::ports::{
    AuthEventStream, ClientContext, IdentityProvider, IdentityProviderError, ProfileStore,
    ProfileStoreError, SubscriptionStatusError, SubscriptionStatusQuery,
};
use crate::domain::{
    AccessToken, AuthEvent, MagicLinkRequest, OAuthRequest, Profile, Session, UserId,
};

/// Build a session for `user_id` with a throwaway token.
pub fn session_for(user_id: &str) -> Session {
    let user_id = UserId::new(user_id).expect("valid test user id");
    let token = AccessToken::new(format!("token-{user_id}")).expect("non-empty token");
    Session::new(user_id, token)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Wall clock that only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let delta = TimeDelta::from_std(delta).expect("duration fits in TimeDelta");
        *lock(&self.0) += delta;
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

#[derive(Debug, Clone)]
struct Scripted<T> {
    delay: Duration,
    value: T,
}

impl<T: Clone> Scripted<T> {
    async fn replay(&self) -> T {
        sleep(self.delay).await;
        self.value.clone()
    }
}

struct SubscriptionGuard(Arc<AtomicUsize>);

impl SubscriptionGuard {
    fn new(live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(live)
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Identity provider replaying scripted answers.
///
/// Session reads pop from a queue and fall back to "no session" once it is
/// empty. The event stream stays open after its scripted events, like a real
/// subscription.
#[derive(Default)]
pub struct ScriptedIdentity {
    sessions: Mutex<VecDeque<Scripted<Result<Option<Session>, IdentityProviderError>>>>,
    exchange: Mutex<Option<Scripted<Result<Session, IdentityProviderError>>>>,
    events: Mutex<Vec<Scripted<AuthEvent>>>,
    magic_link_error: Mutex<Option<IdentityProviderError>>,
    magic_links: Mutex<Vec<MagicLinkRequest>>,
    seen_tokens: Mutex<Vec<Option<String>>>,
    session_calls: AtomicUsize,
    exchange_calls: AtomicUsize,
    live_subscriptions: Arc<AtomicUsize>,
}

impl ScriptedIdentity {
    /// Double with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a session read answer delivered after `delay`.
    #[must_use]
    pub fn session_after(
        self,
        delay: Duration,
        value: Result<Option<Session>, IdentityProviderError>,
    ) -> Self {
        lock(&self.sessions).push_back(Scripted { delay, value });
        self
    }

    /// Answer every code exchange with `value` after `delay`.
    #[must_use]
    pub fn exchange_after(
        self,
        delay: Duration,
        value: Result<Session, IdentityProviderError>,
    ) -> Self {
        *lock(&self.exchange) = Some(Scripted { delay, value });
        self
    }

    /// Emit `event` on every subscription `delay` after subscribing.
    #[must_use]
    pub fn event_after(self, delay: Duration, event: AuthEvent) -> Self {
        lock(&self.events).push(Scripted { delay, value: event });
        self
    }

    /// Fail magic link requests with `error`.
    #[must_use]
    pub fn failing_magic_links(self, error: IdentityProviderError) -> Self {
        *lock(&self.magic_link_error) = Some(error);
        self
    }

    /// Number of session reads.
    pub fn session_calls(&self) -> usize {
        self.session_calls.load(Ordering::SeqCst)
    }

    /// Number of code exchanges.
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    /// Subscriptions not yet dropped.
    pub fn live_subscriptions(&self) -> usize {
        self.live_subscriptions.load(Ordering::SeqCst)
    }

    /// Access tokens presented on each session read, in call order.
    pub fn seen_tokens(&self) -> Vec<Option<String>> {
        lock(&self.seen_tokens).clone()
    }

    /// Magic link requests received.
    pub fn magic_links(&self) -> Vec<MagicLinkRequest> {
        lock(&self.magic_links).clone()
    }
}

#[async_trait]
impl IdentityProvider for ScriptedIdentity {
    async fn current_session(
        &self,
        client: &ClientContext,
    ) -> Result<Option<Session>, IdentityProviderError> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.seen_tokens).push(client.access_token().map(|t| t.expose().to_owned()));
        let next = lock(&self.sessions).pop_front();
        match next {
            Some(scripted) => scripted.replay().await,
            None => Ok(None),
        }
    }

    async fn exchange_code_for_session(
        &self,
        _client: &ClientContext,
        _code: &str,
    ) -> Result<Session, IdentityProviderError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = lock(&self.exchange).clone();
        match scripted {
            Some(scripted) => scripted.replay().await,
            None => Err(IdentityProviderError::rejected("no exchange scripted")),
        }
    }

    fn subscribe(&self, _client: &ClientContext) -> AuthEventStream {
        let events = lock(&self.events).clone();
        let guard = SubscriptionGuard::new(Arc::clone(&self.live_subscriptions));
        let start = Instant::now();
        stream::iter(events)
            .then(move |scripted| async move {
                sleep_until(start + scripted.delay).await;
                scripted.value
            })
            .chain(stream::pending())
            .map(move |event| {
                let _held = &guard;
                event
            })
            .boxed()
    }

    async fn send_magic_link(
        &self,
        request: &MagicLinkRequest,
    ) -> Result<(), IdentityProviderError> {
        lock(&self.magic_links).push(request.clone());
        match lock(&self.magic_link_error).clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn authorize_url(&self, request: &OAuthRequest) -> Result<Url, IdentityProviderError> {
        let mut url = Url::parse("https://identity.test/auth/v1/authorize")
            .map_err(|err| IdentityProviderError::invalid_request(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("provider", request.provider().as_str())
            .append_pair("redirect_to", request.redirect_to().as_str())
            .append_pair("code_challenge", request.code_challenge())
            .append_pair("code_challenge_method", "s256");
        Ok(url)
    }
}

/// Profile store keyed by user id; unknown users have no profile.
#[derive(Default)]
pub struct ScriptedProfiles {
    profiles: Mutex<HashMap<String, Scripted<Result<Option<Profile>, ProfileStoreError>>>>,
    calls: AtomicUsize,
}

impl ScriptedProfiles {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer reads for `user_id` with `value`.
    #[must_use]
    pub fn with(self, user_id: &str, value: Result<Option<Profile>, ProfileStoreError>) -> Self {
        self.with_after(user_id, Duration::ZERO, value)
    }

    /// Answer reads for `user_id` with `value` after `delay`.
    #[must_use]
    pub fn with_after(
        self,
        user_id: &str,
        delay: Duration,
        value: Result<Option<Profile>, ProfileStoreError>,
    ) -> Self {
        lock(&self.profiles).insert(user_id.to_owned(), Scripted { delay, value });
        self
    }

    /// Number of reads.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileStore for ScriptedProfiles {
    async fn fetch_profile(
        &self,
        user_id: &UserId,
        _access_token: &AccessToken,
    ) -> Result<Option<Profile>, ProfileStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = lock(&self.profiles).get(user_id.as_ref()).cloned();
        match scripted {
            Some(scripted) => scripted.replay().await,
            None => Ok(None),
        }
    }
}

/// Subscription status query answering every session the same way.
pub struct ScriptedSubscription {
    answer: Result<Option<String>, SubscriptionStatusError>,
    calls: AtomicUsize,
}

impl ScriptedSubscription {
    /// Report `status` for every account.
    pub fn status(status: &str) -> Self {
        Self::answering(Ok(Some(status.to_owned())))
    }

    /// Report `answer` for every account.
    pub fn answering(answer: Result<Option<String>, SubscriptionStatusError>) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of lookups.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriptionStatusQuery for ScriptedSubscription {
    async fn fetch_status(
        &self,
        _session: &Session,
    ) -> Result<Option<String>, SubscriptionStatusError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}
