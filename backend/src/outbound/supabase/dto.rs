//! Wire shapes returned by Supabase.
//!
//! Responses decode into these DTOs first and are mapped into domain types
//! in one pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{AccessToken, Profile, Role, Session, UserId};

#[derive(Debug, Deserialize)]
pub(super) struct UserDto {
    pub(super) id: String,
}

impl UserDto {
    pub(super) fn user_id(&self) -> Result<UserId, String> {
        UserId::new(&self.id).map_err(|err| format!("user id: {err}"))
    }
}

/// `POST /auth/v1/token` success body.
#[derive(Debug, Deserialize)]
pub(super) struct TokenResponseDto {
    pub(super) access_token: String,
    #[serde(default)]
    pub(super) refresh_token: Option<String>,
    #[serde(default)]
    pub(super) expires_at: Option<i64>,
    pub(super) user: UserDto,
}

impl TokenResponseDto {
    pub(super) fn into_session(self) -> Result<Session, String> {
        let user_id = self.user.user_id()?;
        let access_token =
            AccessToken::new(self.access_token).ok_or_else(|| "empty access token".to_owned())?;
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
        Ok(Session::new(user_id, access_token)
            .with_refresh_token(self.refresh_token.and_then(AccessToken::new))
            .with_expires_at(expires_at))
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PkceGrantDto<'a> {
    pub(super) auth_code: &'a str,
    pub(super) code_verifier: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct OtpRequestDto<'a> {
    pub(super) email: &'a str,
    pub(super) create_user: bool,
    pub(super) code_challenge: &'a str,
    pub(super) code_challenge_method: &'static str,
}

/// Row of `profiles?select=role,onboarding_complete`.
#[derive(Debug, Deserialize)]
pub(super) struct ProfileRowDto {
    #[serde(default)]
    pub(super) role: Option<String>,
    #[serde(default)]
    pub(super) onboarding_complete: Option<bool>,
}

impl ProfileRowDto {
    pub(super) fn into_profile(self) -> Profile {
        let role = self.role.and_then(|raw| match raw.parse::<Role>() {
            Ok(role) => Some(role),
            Err(error) => {
                warn!(%error, "ignoring unrecognised profile role");
                None
            }
        });
        Profile::new(role, self.onboarding_complete.unwrap_or(false))
    }
}

/// `get-subscription-status` body; only `status` matters here.
#[derive(Debug, Deserialize)]
pub(super) struct SubscriptionStatusDto {
    #[serde(default)]
    pub(super) status: Option<String>,
}
