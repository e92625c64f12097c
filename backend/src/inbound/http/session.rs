//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! Wraps the Actix cookie session so handlers only deal with the three values
//! the auth flow keeps per browser: the flow id shared by sibling requests,
//! the PKCE verifier of a pending sign-in, and the confirmed access token.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::ports::{ClientContext, FlowId};
use crate::domain::{AccessToken, CodeVerifier, Error};

pub(crate) const FLOW_ID_KEY: &str = "flow_id";
pub(crate) const PKCE_VERIFIER_KEY: &str = "pkce_verifier";
pub(crate) const ACCESS_TOKEN_KEY: &str = "access_token";

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    fn read(&self, key: &str) -> Result<Option<String>, Error> {
        self.0
            .get::<String>(key)
            .map_err(|error| Error::internal(format!("failed to read session: {error}")))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), Error> {
        self.0
            .insert(key, value)
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Flow id for this browser, minting and persisting one when absent.
    pub fn flow_id(&self) -> Result<FlowId, Error> {
        if let Some(raw) = self.read(FLOW_ID_KEY)? {
            match raw.parse::<FlowId>() {
                Ok(id) => return Ok(id),
                Err(error) => warn!(%error, "invalid flow id in session cookie; minting a new one"),
            }
        }
        let id = FlowId::generate();
        self.write(FLOW_ID_KEY, &id.to_string())?;
        Ok(id)
    }

    /// Remember the verifier of a sign-in that was just started.
    pub fn store_code_verifier(&self, verifier: &CodeVerifier) -> Result<(), Error> {
        self.write(PKCE_VERIFIER_KEY, verifier.expose())
    }

    /// Persist the confirmed access token and retire the spent verifier.
    pub fn persist_access_token(&self, token: &AccessToken) -> Result<(), Error> {
        self.write(ACCESS_TOKEN_KEY, token.expose())?;
        self.0.remove(PKCE_VERIFIER_KEY);
        Ok(())
    }

    /// Drop a token the identity provider no longer accepts.
    pub fn clear_access_token(&self) {
        self.0.remove(ACCESS_TOKEN_KEY);
    }

    /// Everything the identity provider needs to know about this browser.
    pub fn client_context(&self) -> Result<ClientContext, Error> {
        let flow_id = self.flow_id()?;
        let access_token = self.read(ACCESS_TOKEN_KEY)?.and_then(AccessToken::new);
        let verifier = self.read(PKCE_VERIFIER_KEY)?;
        Ok(ClientContext::new(flow_id)
            .with_access_token(access_token)
            .with_code_verifier(verifier))
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
