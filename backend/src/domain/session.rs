//! Sessions and auth-state-change events.
//!
//! A [`Session`] is either fully present (user id resolvable, token held) or
//! absent; there is no partially populated variant for callers to act on.

use std::fmt;

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

use crate::domain::UserId;

/// Bearer credential issued by the identity provider.
///
/// The secret is zeroised on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(Zeroizing<String>);

impl AccessToken {
    /// Wrap a raw token, returning `None` when it is blank.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return None;
        }
        Some(Self(Zeroizing::new(raw)))
    }

    /// Raw token value for outbound `Authorization` headers.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Authenticated session for one user.
///
/// # Examples
/// ```
/// use session_gate::domain::{AccessToken, Session, UserId};
///
/// let token = AccessToken::new("jwt").expect("non-empty token");
/// let session = Session::new(UserId::new("user-1").expect("id"), token);
/// assert_eq!(session.user_id().as_ref(), "user-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: UserId,
    access_token: AccessToken,
    refresh_token: Option<AccessToken>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Build a session from its mandatory parts.
    pub fn new(user_id: UserId, access_token: AccessToken) -> Self {
        Self {
            user_id,
            access_token,
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Attach the refresh token returned alongside the access token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: Option<AccessToken>) -> Self {
        self.refresh_token = refresh_token;
        self
    }

    /// Attach the absolute expiry of the access token.
    #[must_use]
    pub fn with_expires_at(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// Authenticated user.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Bearer token for calls made on the user's behalf.
    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    /// Refresh token, when the provider issued one.
    pub fn refresh_token(&self) -> Option<&AccessToken> {
        self.refresh_token.as_ref()
    }

    /// Absolute access token expiry, when known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the access token has expired at `now`.
    ///
    /// Sessions without a known expiry are treated as live; the provider
    /// remains the authority and rejects stale tokens on use.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

/// Kind of auth-state-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthEventKind {
    /// A user signed in.
    SignedIn,
    /// An existing session received a fresh access token.
    TokenRefreshed,
    /// The session was cleared.
    SignedOut,
    /// User attributes changed.
    UserUpdated,
}

impl AuthEventKind {
    /// Wire name used by the identity provider.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SignedIn => "SIGNED_IN",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::SignedOut => "SIGNED_OUT",
            Self::UserUpdated => "USER_UPDATED",
        }
    }
}

impl fmt::Display for AuthEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Auth-state-change notification, optionally carrying a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    kind: AuthEventKind,
    session: Option<Session>,
}

impl AuthEvent {
    /// Build an event of any kind.
    pub fn new(kind: AuthEventKind, session: Option<Session>) -> Self {
        Self { kind, session }
    }

    /// `SIGNED_IN` carrying `session`.
    pub fn signed_in(session: Session) -> Self {
        Self::new(AuthEventKind::SignedIn, Some(session))
    }

    /// `TOKEN_REFRESHED` carrying `session`.
    pub fn token_refreshed(session: Session) -> Self {
        Self::new(AuthEventKind::TokenRefreshed, Some(session))
    }

    /// `SIGNED_OUT` without a session.
    pub fn signed_out() -> Self {
        Self::new(AuthEventKind::SignedOut, None)
    }

    /// Event kind.
    pub fn kind(&self) -> AuthEventKind {
        self.kind
    }

    /// Session attached to the event, regardless of kind.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Session that confirms a sign-in: only `SIGNED_IN` and
    /// `TOKEN_REFRESHED` events carrying a session qualify.
    pub fn into_confirmed_session(self) -> Option<Session> {
        match self.kind {
            AuthEventKind::SignedIn | AuthEventKind::TokenRefreshed => self.session,
            AuthEventKind::SignedOut | AuthEventKind::UserUpdated => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    #[fixture]
    fn session() -> Session {
        Session::new(
            UserId::new("user-1").expect("id"),
            AccessToken::new("token").expect("token"),
        )
    }

    #[rstest]
    #[case("")]
    #[case("  ")]
    fn blank_tokens_are_rejected(#[case] raw: &str) {
        assert!(AccessToken::new(raw).is_none());
    }

    #[rstest]
    fn token_debug_output_is_redacted() {
        let token = AccessToken::new("secret-value").expect("token");
        assert_eq!(format!("{token:?}"), "AccessToken(***)");
    }

    #[rstest]
    fn expiry_is_inclusive(session: Session) {
        let expiry = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).single().expect("date");
        let session = session.with_expires_at(Some(expiry));
        assert!(session.is_expired_at(expiry));
        assert!(!session.is_expired_at(expiry - chrono::Duration::seconds(1)));
    }

    #[rstest]
    fn session_without_expiry_never_expires(session: Session) {
        assert!(!session.is_expired_at(Utc::now()));
    }

    #[rstest]
    #[case(AuthEventKind::SignedIn, true)]
    #[case(AuthEventKind::TokenRefreshed, true)]
    #[case(AuthEventKind::SignedOut, false)]
    #[case(AuthEventKind::UserUpdated, false)]
    fn only_sign_in_and_refresh_confirm_sessions(
        session: Session,
        #[case] kind: AuthEventKind,
        #[case] confirms: bool,
    ) {
        let event = AuthEvent::new(kind, Some(session));
        assert_eq!(event.into_confirmed_session().is_some(), confirms);
    }

    #[rstest]
    fn sign_in_without_session_does_not_confirm() {
        let event = AuthEvent::new(AuthEventKind::SignedIn, None);
        assert!(event.into_confirmed_session().is_none());
    }
}
