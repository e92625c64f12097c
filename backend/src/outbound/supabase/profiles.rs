//! PostgREST-backed profile store.

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};

use super::dto::ProfileRowDto;
use super::{SupabaseHttp, status_message};
use crate::domain::ports::{ProfileStore, ProfileStoreError};
use crate::domain::{AccessToken, Profile, UserId};

/// Reads `profiles` rows with the user's own token.
pub struct SupabaseProfileStore {
    http: SupabaseHttp,
}

impl SupabaseProfileStore {
    /// Adapter over `http`.
    pub fn new(http: SupabaseHttp) -> Self {
        Self { http }
    }

    fn profile_url(&self, user_id: &UserId) -> Result<Url, ProfileStoreError> {
        let mut url = self
            .http
            .endpoint("/rest/v1/profiles")
            .map_err(|err| ProfileStoreError::query(format!("profiles endpoint: {err}")))?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{user_id}"))
            .append_pair("select", "role,onboarding_complete");
        Ok(url)
    }
}

#[async_trait]
impl ProfileStore for SupabaseProfileStore {
    async fn fetch_profile(
        &self,
        user_id: &UserId,
        access_token: &AccessToken,
    ) -> Result<Option<Profile>, ProfileStoreError> {
        let response = self
            .http
            .request(Method::GET, self.profile_url(user_id)?)
            .bearer_auth(access_token.expose())
            .send()
            .await
            .map_err(|error| ProfileStoreError::connection(error.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| ProfileStoreError::connection(error.to_string()))?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        parse_rows(body.as_ref())
    }
}

fn parse_rows(body: &[u8]) -> Result<Option<Profile>, ProfileStoreError> {
    let rows: Vec<ProfileRowDto> = serde_json::from_slice(body).map_err(|error| {
        ProfileStoreError::query(format!("invalid profiles JSON payload: {error}"))
    })?;
    Ok(rows.into_iter().next().map(ProfileRowDto::into_profile))
}

fn map_status_error(status: StatusCode, body: &[u8]) -> ProfileStoreError {
    let message = status_message(status, body);
    if status.is_server_error() {
        ProfileStoreError::connection(message)
    } else {
        ProfileStoreError::query(message)
    }
}
