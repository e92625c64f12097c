//! Parameters carried by a sign-in callback or login page request.
//!
//! The identity provider returns either an authorisation `code` (PKCE) in
//! the query string or implicit-flow tokens after `#`. Both shapes are
//! parsed here; anything else is ignored.

use tracing::warn;
use url::{Url, form_urlencoded};

use super::{AccessToken, NextPath};

/// Implicit-flow tokens delivered in the URL fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashTokens {
    access_token: AccessToken,
    refresh_token: Option<AccessToken>,
}

impl HashTokens {
    /// Bundle tokens read from a fragment.
    pub fn new(access_token: AccessToken, refresh_token: Option<AccessToken>) -> Self {
        Self {
            access_token,
            refresh_token,
        }
    }

    /// Access token from `#access_token=`.
    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    /// Refresh token from `#refresh_token=`, when present.
    pub fn refresh_token(&self) -> Option<&AccessToken> {
        self.refresh_token.as_ref()
    }
}

/// Parsed callback inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    code: Option<String>,
    next: Option<NextPath>,
    debug: bool,
    hash_tokens: Option<HashTokens>,
}

#[derive(Default)]
struct RawParams {
    code: Option<String>,
    next: Option<String>,
    debug: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
}

impl RawParams {
    fn absorb(&mut self, encoded: &str) {
        for (key, value) in form_urlencoded::parse(encoded.as_bytes()) {
            let value = value.into_owned();
            let slot = match key.as_ref() {
                "code" => &mut self.code,
                "next" => &mut self.next,
                "debug" => &mut self.debug,
                "access_token" => &mut self.access_token,
                "refresh_token" => &mut self.refresh_token,
                _ => continue,
            };
            // First occurrence wins for repeated keys.
            if slot.is_none() {
                *slot = Some(value);
            }
        }
    }

    fn into_params(self) -> CallbackParams {
        let code = self
            .code
            .map(|code| code.trim().to_owned())
            .filter(|code| !code.is_empty());
        let next = self.next.and_then(|raw| match NextPath::parse(&raw) {
            Ok(path) => Some(path),
            Err(error) => {
                warn!(%error, "ignoring unsafe next parameter");
                None
            }
        });
        let debug = self.debug.as_deref() == Some("1");
        let hash_tokens = self.access_token.and_then(AccessToken::new).map(|access| {
            HashTokens::new(access, self.refresh_token.and_then(AccessToken::new))
        });
        CallbackParams {
            code,
            next,
            debug,
            hash_tokens,
        }
    }
}

impl CallbackParams {
    /// Parse a raw query string (without the leading `?`).
    ///
    /// Fragment-style token pairs are also honoured here so adapters that
    /// relay the fragment as form data share the same parser.
    ///
    /// # Examples
    /// ```
    /// use session_gate::domain::CallbackParams;
    ///
    /// let params = CallbackParams::from_query("code=abc123&next=%2Fjournalist%2Fpitches&debug=1");
    /// assert_eq!(params.code(), Some("abc123"));
    /// assert_eq!(params.next().map(|n| n.as_str()), Some("/journalist/pitches"));
    /// assert!(params.debug());
    /// ```
    pub fn from_query(query: &str) -> Self {
        let mut raw = RawParams::default();
        raw.absorb(query);
        raw.into_params()
    }

    /// Parse both the query string and the fragment of a full URL.
    pub fn from_url(url: &Url) -> Self {
        let mut raw = RawParams::default();
        if let Some(query) = url.query() {
            raw.absorb(query);
        }
        if let Some(fragment) = url.fragment() {
            raw.absorb(fragment);
        }
        raw.into_params()
    }

    /// Attach an authorisation code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach a validated `next` path.
    #[must_use]
    pub fn with_next(mut self, next: NextPath) -> Self {
        self.next = Some(next);
        self
    }

    /// Toggle diagnostics.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Attach implicit-flow tokens.
    #[must_use]
    pub fn with_hash_tokens(mut self, tokens: HashTokens) -> Self {
        self.hash_tokens = Some(tokens);
        self
    }

    /// Authorisation code, if present.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Validated `next` path, if present.
    pub fn next(&self) -> Option<&NextPath> {
        self.next.as_ref()
    }

    /// Whether `debug=1` was supplied.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Fragment tokens, if present.
    pub fn hash_tokens(&self) -> Option<&HashTokens> {
        self.hash_tokens.as_ref()
    }
}
