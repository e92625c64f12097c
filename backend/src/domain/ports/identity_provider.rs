//! Driven port for the hosted identity provider.
//!
//! Covers the session reads the resolver races against, the PKCE code
//! exchange, the auth-state-change stream, and sign-in initiation.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use url::Url;
use uuid::Uuid;

use crate::domain::{AccessToken, AuthEvent, MagicLinkRequest, OAuthRequest, Session, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity provider adapters.
    pub enum IdentityProviderError {
        /// Provider could not be reached or timed out.
        Transport { message: String } => "identity provider transport failed: {message}",
        /// Provider answered but refused the request (bad code, used link).
        Rejected { message: String } => "identity provider rejected request: {message}",
        /// Provider response could not be decoded.
        Decode { message: String } => "identity provider response invalid: {message}",
        /// Request could not be built from the supplied inputs.
        InvalidRequest { message: String } => "identity provider request invalid: {message}",
    }
}

/// Per-browser identifier tying duplicate callback requests together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowId(Uuid);

impl FlowId {
    /// Fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for FlowId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Client-held state the provider needs to answer for one browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContext {
    flow_id: FlowId,
    access_token: Option<AccessToken>,
    code_verifier: Option<String>,
}

impl ClientContext {
    /// Context for `flow_id` with no stored credentials.
    pub fn new(flow_id: FlowId) -> Self {
        Self {
            flow_id,
            access_token: None,
            code_verifier: None,
        }
    }

    /// Attach a stored or freshly delivered access token.
    #[must_use]
    pub fn with_access_token(mut self, token: Option<AccessToken>) -> Self {
        self.access_token = token;
        self
    }

    /// Attach the PKCE verifier kept since sign-in started.
    #[must_use]
    pub fn with_code_verifier(mut self, verifier: Option<String>) -> Self {
        self.code_verifier = verifier;
        self
    }

    /// Flow identifier.
    pub fn flow_id(&self) -> FlowId {
        self.flow_id
    }

    /// Stored access token.
    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    /// Stored PKCE verifier.
    pub fn code_verifier(&self) -> Option<&str> {
        self.code_verifier.as_deref()
    }
}

/// Auth-state-change notifications for one flow.
pub type AuthEventStream = BoxStream<'static, AuthEvent>;

/// Port for the identity provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Session currently held by the client, if the provider still honours it.
    async fn current_session(
        &self,
        client: &ClientContext,
    ) -> Result<Option<Session>, IdentityProviderError>;

    /// Trade a one-time authorisation code for a session.
    async fn exchange_code_for_session(
        &self,
        client: &ClientContext,
        code: &str,
    ) -> Result<Session, IdentityProviderError>;

    /// Subscribe to auth-state changes for the client's flow.
    ///
    /// Dropping the stream releases the subscription.
    fn subscribe(&self, client: &ClientContext) -> AuthEventStream;

    /// Ask the provider to email a one-time sign-in link.
    async fn send_magic_link(&self, request: &MagicLinkRequest)
    -> Result<(), IdentityProviderError>;

    /// Provider URL that starts an OAuth sign-in.
    fn authorize_url(&self, request: &OAuthRequest) -> Result<Url, IdentityProviderError>;
}

/// Fixture provider for wiring without a hosted backend.
///
/// Any stored token resolves to the fixture user and any non-empty code
/// exchanges successfully.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureIdentityProvider;

const FIXTURE_USER_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

impl FixtureIdentityProvider {
    fn session_for(token: AccessToken) -> Result<Session, IdentityProviderError> {
        let user_id = UserId::new(FIXTURE_USER_ID)
            .map_err(|err| IdentityProviderError::decode(err.to_string()))?;
        Ok(Session::new(user_id, token))
    }
}

#[async_trait]
impl IdentityProvider for FixtureIdentityProvider {
    async fn current_session(
        &self,
        client: &ClientContext,
    ) -> Result<Option<Session>, IdentityProviderError> {
        client
            .access_token()
            .cloned()
            .map(Self::session_for)
            .transpose()
    }

    async fn exchange_code_for_session(
        &self,
        _client: &ClientContext,
        code: &str,
    ) -> Result<Session, IdentityProviderError> {
        let token = AccessToken::new(format!("fixture-{code}"))
            .filter(|_| !code.trim().is_empty())
            .ok_or_else(|| IdentityProviderError::rejected("empty authorisation code"))?;
        Self::session_for(token)
    }

    fn subscribe(&self, _client: &ClientContext) -> AuthEventStream {
        stream::empty().boxed()
    }

    async fn send_magic_link(
        &self,
        _request: &MagicLinkRequest,
    ) -> Result<(), IdentityProviderError> {
        Ok(())
    }

    fn authorize_url(&self, request: &OAuthRequest) -> Result<Url, IdentityProviderError> {
        let mut url = Url::parse("https://identity.fixture.invalid/authorize")
            .map_err(|err| IdentityProviderError::invalid_request(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("provider", request.provider().as_str())
            .append_pair("redirect_to", request.redirect_to().as_str())
            .append_pair("code_challenge", request.code_challenge())
            .append_pair("code_challenge_method", "s256");
        Ok(url)
    }
}
