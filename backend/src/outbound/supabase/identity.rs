//! GoTrue-backed identity provider.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};

use super::dto::{OtpRequestDto, PkceGrantDto, TokenResponseDto, UserDto};
use super::{SupabaseHttp, status_message};
use crate::domain::ports::{AuthEventStream, ClientContext, IdentityProvider, IdentityProviderError};
use crate::domain::{AccessToken, AuthEvent, MagicLinkRequest, OAuthRequest, Session};
use crate::outbound::events::AuthEventHub;

/// Identity provider speaking to `/auth/v1`.
///
/// Sessions confirmed here are published on the [`AuthEventHub`] so sibling
/// requests of the same flow observe them.
pub struct SupabaseIdentityProvider {
    http: SupabaseHttp,
    hub: Arc<AuthEventHub>,
}

impl SupabaseIdentityProvider {
    /// Adapter over `http`, publishing to `hub`.
    pub fn new(http: SupabaseHttp, hub: Arc<AuthEventHub>) -> Self {
        Self { http, hub }
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityProviderError> {
        self.http
            .endpoint(path)
            .map_err(|err| IdentityProviderError::invalid_request(format!("endpoint {path}: {err}")))
    }

    async fn fetch_user(&self, token: &AccessToken) -> Result<Option<Session>, IdentityProviderError> {
        let response = self
            .http
            .request(Method::GET, self.endpoint("/auth/v1/user")?)
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Ok(None);
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        let user: UserDto = decode(body.as_ref())?;
        let user_id = user.user_id().map_err(IdentityProviderError::decode)?;
        Ok(Some(Session::new(user_id, token.clone())))
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    async fn current_session(
        &self,
        client: &ClientContext,
    ) -> Result<Option<Session>, IdentityProviderError> {
        match client.access_token() {
            Some(token) => self.fetch_user(token).await,
            None => Ok(self.hub.cached_session(client.flow_id())),
        }
    }

    async fn exchange_code_for_session(
        &self,
        client: &ClientContext,
        code: &str,
    ) -> Result<Session, IdentityProviderError> {
        let verifier = client.code_verifier().ok_or_else(|| {
            IdentityProviderError::invalid_request("no PKCE verifier stored for this browser")
        })?;
        let mut url = self.endpoint("/auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "pkce");

        let response = self
            .http
            .request(Method::POST, url)
            .json(&PkceGrantDto {
                auth_code: code,
                code_verifier: verifier,
            })
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        let token: TokenResponseDto = decode(body.as_ref())?;
        let session = token
            .into_session()
            .map_err(IdentityProviderError::decode)?;

        self.hub
            .publish(client.flow_id(), AuthEvent::signed_in(session.clone()));
        Ok(session)
    }

    fn subscribe(&self, client: &ClientContext) -> AuthEventStream {
        self.hub.subscribe(client.flow_id())
    }

    async fn send_magic_link(
        &self,
        request: &MagicLinkRequest,
    ) -> Result<(), IdentityProviderError> {
        let mut url = self.endpoint("/auth/v1/otp")?;
        url.query_pairs_mut()
            .append_pair("redirect_to", request.redirect_to().as_str());

        let response = self
            .http
            .request(Method::POST, url)
            .json(&OtpRequestDto {
                email: request.email().as_str(),
                create_user: true,
                code_challenge: request.code_challenge(),
                code_challenge_method: "s256",
            })
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        Err(map_status_error(status, body.as_ref()))
    }

    fn authorize_url(&self, request: &OAuthRequest) -> Result<Url, IdentityProviderError> {
        let mut url = self.endpoint("/auth/v1/authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", request.provider().as_str())
            .append_pair("redirect_to", request.redirect_to().as_str())
            .append_pair("code_challenge", request.code_challenge())
            .append_pair("code_challenge_method", "s256");
        Ok(url)
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, IdentityProviderError> {
    serde_json::from_slice(body).map_err(|error| {
        IdentityProviderError::decode(format!("invalid auth API JSON payload: {error}"))
    })
}

fn map_transport_error(error: reqwest::Error) -> IdentityProviderError {
    IdentityProviderError::transport(error.to_string())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> IdentityProviderError {
    let message = status_message(status, body);
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            IdentityProviderError::transport(message)
        }
        _ if status.is_client_error() => IdentityProviderError::rejected(message),
        _ => IdentityProviderError::transport(message),
    }
}
