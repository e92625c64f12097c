//! Edge-function-backed subscription status lookup.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};

use super::dto::SubscriptionStatusDto;
use super::{SupabaseHttp, status_message};
use crate::domain::Session;
use crate::domain::ports::{SubscriptionStatusError, SubscriptionStatusQuery};

const FUNCTION_PATH: &str = "/functions/v1/get-subscription-status";

/// Calls `get-subscription-status` on behalf of the signed-in user.
pub struct SupabaseSubscriptionStatus {
    http: SupabaseHttp,
}

impl SupabaseSubscriptionStatus {
    /// Adapter over `http`.
    pub fn new(http: SupabaseHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SubscriptionStatusQuery for SupabaseSubscriptionStatus {
    async fn fetch_status(
        &self,
        session: &Session,
    ) -> Result<Option<String>, SubscriptionStatusError> {
        let url = self.http.endpoint(FUNCTION_PATH).map_err(|err| {
            SubscriptionStatusError::transport(format!("function endpoint: {err}"))
        })?;
        let response = self
            .http
            .request(Method::POST, url)
            .bearer_auth(session.access_token().expose())
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|error| SubscriptionStatusError::transport(error.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| SubscriptionStatusError::transport(error.to_string()))?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SubscriptionStatusError::transport(status_message(
                status,
                body.as_ref(),
            )));
        }
        parse_status(body.as_ref())
    }
}

fn parse_status(body: &[u8]) -> Result<Option<String>, SubscriptionStatusError> {
    let dto: SubscriptionStatusDto = serde_json::from_slice(body).map_err(|error| {
        SubscriptionStatusError::decode(format!("invalid subscription JSON payload: {error}"))
    })?;
    Ok(dto.status.filter(|status| !status.trim().is_empty()))
}
