//! Redirect targets, reasons, and the open-redirect guard for `next`.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

const ORIGIN_PROBE: &str = "https://session-gate.invalid/";

/// Which branch of the flow produced a navigation. Diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    /// Nothing has fired yet.
    #[default]
    None,
    /// Profile missing or onboarding incomplete.
    Onboarding,
    /// Journalist dashboard.
    Journalist,
    /// Shared founder/agency feed.
    Feed,
    /// Caller-supplied `next` path.
    NextParam,
    /// Identity provider failed while checking the session.
    AuthFailed,
    /// No session exists.
    NoSession,
    /// Authorisation code rejected or already used.
    ExchangeFailed,
    /// Resolution did not finish before the deadline.
    Timeout,
}

impl RedirectReason {
    /// Stable `snake_case` name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Onboarding => "onboarding",
            Self::Journalist => "journalist",
            Self::Feed => "feed",
            Self::NextParam => "next_param",
            Self::AuthFailed => "auth_failed",
            Self::NoSession => "no_session",
            Self::ExchangeFailed => "exchange_failed",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for RedirectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a `next` value is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NextPathError {
    /// Blank once trimmed.
    #[error("next path must not be empty")]
    Empty,
    /// Does not start with `/` (absolute URL or relative segment).
    #[error("next path must be root-relative")]
    NotRootRelative,
    /// Starts with `//` or `/\`, which browsers resolve to another host.
    #[error("next path must not be protocol-relative")]
    ProtocolRelative,
    /// Contains control characters or backslashes.
    #[error("next path contains forbidden characters")]
    ForbiddenCharacters,
    /// Resolves to a different origin.
    #[error("next path escapes the site origin")]
    EscapesOrigin,
}

/// Same-origin, root-relative redirect target supplied by the caller.
///
/// # Examples
/// ```
/// use session_gate::domain::{NextPath, NextPathError};
///
/// assert!(NextPath::parse("/journalist/dashboard").is_ok());
/// assert_eq!(
///     NextPath::parse("https://evil.example.com"),
///     Err(NextPathError::NotRootRelative)
/// );
/// assert_eq!(
///     NextPath::parse("//evil.example.com"),
///     Err(NextPathError::ProtocolRelative)
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NextPath(String);

impl NextPath {
    /// Validate a raw `next` value.
    pub fn parse(raw: &str) -> Result<Self, NextPathError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(NextPathError::Empty);
        }
        if !trimmed.starts_with('/') {
            return Err(NextPathError::NotRootRelative);
        }
        if trimmed.starts_with("//") || trimmed.starts_with("/\\") {
            return Err(NextPathError::ProtocolRelative);
        }
        if trimmed.chars().any(|c| c.is_control() || c == '\\') {
            return Err(NextPathError::ForbiddenCharacters);
        }

        let base = Url::parse(ORIGIN_PROBE).map_err(|_| NextPathError::EscapesOrigin)?;
        let resolved = base.join(trimmed).map_err(|_| NextPathError::EscapesOrigin)?;
        if resolved.origin() != base.origin() {
            return Err(NextPathError::EscapesOrigin);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Validated path, verbatim.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for NextPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Site paths the flow can send a user to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destinations {
    /// Login page; also the recovery target for failed sign-ins.
    pub login: String,
    /// Onboarding wizard entry.
    pub onboarding: String,
    /// Plan selection step of onboarding.
    pub plan_selection: String,
    /// Journalist home.
    pub journalist_dashboard: String,
    /// Shared founder/agency feed.
    pub feed: String,
}

impl Default for Destinations {
    fn default() -> Self {
        Self {
            login: "/auth".to_owned(),
            onboarding: "/onboarding".to_owned(),
            plan_selection: "/onboarding?step=plan".to_owned(),
            journalist_dashboard: "/journalist/dashboard".to_owned(),
            feed: "/feed".to_owned(),
        }
    }
}

/// A full-document navigation decided by the flow.
///
/// Navigations are never client-side pushes: adapters render them as hard
/// redirects so stale in-memory state from the auth flow is discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    target: String,
    reason: RedirectReason,
}

impl Navigation {
    /// Navigate to `target` for `reason`.
    pub fn new(target: impl Into<String>, reason: RedirectReason) -> Self {
        Self {
            target: target.into(),
            reason,
        }
    }

    /// Destination path.
    pub fn target(&self) -> &str {
        self.target.as_str()
    }

    /// Diagnostic reason.
    pub fn reason(&self) -> RedirectReason {
        self.reason
    }

    /// Carry `debug=1` onto the destination when diagnostics are enabled.
    ///
    /// # Examples
    /// ```
    /// use session_gate::domain::{Navigation, RedirectReason};
    ///
    /// let nav = Navigation::new("/onboarding?step=plan", RedirectReason::Onboarding);
    /// assert_eq!(nav.preserve_debug(true).target(), "/onboarding?step=plan&debug=1");
    /// ```
    #[must_use]
    pub fn preserve_debug(mut self, debug: bool) -> Self {
        if !debug {
            return self;
        }
        let (path, fragment) = match self.target.split_once('#') {
            Some((path, fragment)) => (path.to_owned(), Some(fragment.to_owned())),
            None => (self.target.clone(), None),
        };
        let already_set = path
            .split_once('?')
            .is_some_and(|(_, query)| query.split('&').any(|pair| pair == "debug=1"));
        if already_set {
            return self;
        }
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut target = format!("{path}{separator}debug=1");
        if let Some(fragment) = fragment {
            target.push('#');
            target.push_str(&fragment);
        }
        self.target = target;
        self
    }
}
