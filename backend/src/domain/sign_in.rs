//! Starting a sign-in: magic links and OAuth redirects, both under PKCE.
//!
//! The verifier half of the PKCE pair stays with the browser (in the private
//! session cookie); only its S256 challenge is sent to the provider. The
//! callback later presents the verifier with the returned code.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use url::Url;
use utoipa::ToSchema;
use zeroize::Zeroizing;

use super::ports::{IdentityProvider, IdentityProviderError};
use super::{Error, NextPath};

const CALLBACK_PATH: &str = "/auth/callback";

/// PKCE code verifier (RFC 7636), 43 URL-safe characters.
#[derive(Clone, PartialEq, Eq)]
pub struct CodeVerifier(Zeroizing<String>);

impl CodeVerifier {
    /// Fresh verifier from 32 random bytes.
    pub fn generate() -> Self {
        let mut bytes = [0_u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(Zeroizing::new(URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Restore a verifier read back from the session cookie.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(Zeroizing::new(raw.into()))
    }

    /// Raw verifier for the token exchange.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// `S256` challenge: base64url(sha256(verifier)) without padding.
    ///
    /// # Examples
    /// ```
    /// use session_gate::domain::CodeVerifier;
    ///
    /// // Appendix B of RFC 7636.
    /// let verifier = CodeVerifier::from_stored("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
    /// assert_eq!(verifier.challenge(), "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    /// ```
    pub fn challenge(&self) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(self.expose().as_bytes()))
    }
}

impl fmt::Debug for CodeVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CodeVerifier(***)")
    }
}

/// Reasons an email address is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmailAddressError {
    /// Blank once trimmed.
    #[error("email must not be empty")]
    Empty,
    /// Not of the form `local@domain.tld`.
    #[error("email address is malformed")]
    Malformed,
}

/// Syntactically plausible email address, trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validate `raw`.
    pub fn parse(raw: &str) -> Result<Self, EmailAddressError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(EmailAddressError::Empty);
        }
        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(EmailAddressError::Malformed);
        };
        let domain_ok = domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
            && !domain.ends_with('.');
        if local.is_empty()
            || !domain_ok
            || domain.contains('@')
            || trimmed.chars().any(char::is_whitespace)
        {
            return Err(EmailAddressError::Malformed);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Address text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// OAuth providers offered on the login page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    /// Google accounts.
    Google,
}

impl OAuthProvider {
    /// Provider slug understood by the identity provider.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
        }
    }
}

/// Raised for providers that are not offered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported oauth provider: {0}")]
pub struct UnsupportedProviderError(pub String);

impl FromStr for OAuthProvider {
    type Err = UnsupportedProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("google") {
            Ok(Self::Google)
        } else {
            Err(UnsupportedProviderError(s.to_owned()))
        }
    }
}

/// Outbound magic link request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicLinkRequest {
    email: EmailAddress,
    redirect_to: Url,
    code_challenge: String,
}

impl MagicLinkRequest {
    /// Build a request.
    pub fn new(email: EmailAddress, redirect_to: Url, code_challenge: impl Into<String>) -> Self {
        Self {
            email,
            redirect_to,
            code_challenge: code_challenge.into(),
        }
    }

    /// Recipient.
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Callback URL embedded in the link.
    pub fn redirect_to(&self) -> &Url {
        &self.redirect_to
    }

    /// PKCE S256 challenge.
    pub fn code_challenge(&self) -> &str {
        &self.code_challenge
    }
}

/// Outbound OAuth authorisation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthRequest {
    provider: OAuthProvider,
    redirect_to: Url,
    code_challenge: String,
}

impl OAuthRequest {
    /// Build a request.
    pub fn new(provider: OAuthProvider, redirect_to: Url, code_challenge: impl Into<String>) -> Self {
        Self {
            provider,
            redirect_to,
            code_challenge: code_challenge.into(),
        }
    }

    /// Provider.
    pub fn provider(&self) -> OAuthProvider {
        self.provider
    }

    /// Callback URL the provider returns to.
    pub fn redirect_to(&self) -> &Url {
        &self.redirect_to
    }

    /// PKCE S256 challenge.
    pub fn code_challenge(&self) -> &str {
        &self.code_challenge
    }
}

/// Sign-in started; the verifier must be kept for the callback.
#[derive(Debug)]
pub struct PendingSignIn {
    /// Verifier to store client-side.
    pub verifier: CodeVerifier,
    /// Provider URL to send the browser to (OAuth only).
    pub redirect: Option<Url>,
}

fn map_identity_error(error: IdentityProviderError) -> Error {
    match error {
        IdentityProviderError::Transport { .. } | IdentityProviderError::Decode { .. } => {
            Error::service_unavailable("identity provider unavailable")
        }
        IdentityProviderError::Rejected { message }
        | IdentityProviderError::InvalidRequest { message } => Error::invalid_request(message),
    }
}

/// Starts sign-ins against the identity provider.
#[derive(Clone)]
pub struct SignInService {
    identity: Arc<dyn IdentityProvider>,
    site_url: Url,
}

impl SignInService {
    /// Service issuing callbacks under `site_url`.
    pub fn new(identity: Arc<dyn IdentityProvider>, site_url: Url) -> Self {
        Self { identity, site_url }
    }

    /// Absolute callback URL, carrying `next` when given.
    pub fn callback_url(&self, next: Option<&NextPath>) -> Result<Url, Error> {
        let mut url = self
            .site_url
            .join(CALLBACK_PATH)
            .map_err(|err| Error::internal(format!("invalid site url: {err}")))?;
        if let Some(next) = next {
            url.query_pairs_mut().append_pair("next", next.as_str());
        }
        Ok(url)
    }

    /// Email a magic link to `email`.
    pub async fn request_magic_link(
        &self,
        email: &str,
        next: Option<&NextPath>,
    ) -> Result<PendingSignIn, Error> {
        let email =
            EmailAddress::parse(email).map_err(|err| Error::invalid_request(err.to_string()))?;
        let verifier = CodeVerifier::generate();
        let request =
            MagicLinkRequest::new(email, self.callback_url(next)?, verifier.challenge());
        self.identity
            .send_magic_link(&request)
            .await
            .map_err(|error| {
                warn!(%error, "magic link request failed");
                map_identity_error(error)
            })?;
        info!("magic link sent");
        Ok(PendingSignIn {
            verifier,
            redirect: None,
        })
    }

    /// Provider authorisation URL for `provider`.
    pub fn oauth_redirect(
        &self,
        provider: OAuthProvider,
        next: Option<&NextPath>,
    ) -> Result<PendingSignIn, Error> {
        let verifier = CodeVerifier::generate();
        let request = OAuthRequest::new(provider, self.callback_url(next)?, verifier.challenge());
        let url = self
            .identity
            .authorize_url(&request)
            .map_err(map_identity_error)?;
        Ok(PendingSignIn {
            verifier,
            redirect: Some(url),
        })
    }
}
