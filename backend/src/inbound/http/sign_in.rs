//! Sign-in initiation handlers.
//!
//! ```text
//! POST /auth/magic-link {"email":"ada@example.com","next":"/feed"}
//! GET /auth/oauth/google?next=/feed
//! ```
//!
//! Both mint a PKCE verifier and keep it in the session cookie so the
//! callback can complete the code exchange from the same browser.

use actix_web::http::header;
use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use utoipa::{IntoParams, ToSchema};

use crate::domain::{ApiResult, Error, NextPath, OAuthProvider};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Request body for `POST /auth/magic-link`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct MagicLinkBody {
    #[schema(example = "ada@example.com")]
    pub email: String,
    /// Root-relative path to land on after signing in.
    #[serde(default)]
    #[schema(example = "/feed")]
    pub next: Option<String>,
}

/// Optional return path for OAuth sign-in.
#[derive(Debug, Deserialize, IntoParams)]
pub struct OAuthQuery {
    /// Root-relative path to land on after signing in.
    pub next: Option<String>,
}

/// Acknowledgement sent once the provider accepted the request.
#[derive(Debug, Serialize, ToSchema)]
pub struct MagicLinkAccepted {
    #[schema(example = "magic_link_sent")]
    pub status: String,
}

fn safe_next(raw: Option<&str>) -> Option<NextPath> {
    let raw = raw?;
    match NextPath::parse(raw) {
        Ok(next) => Some(next),
        Err(error) => {
            warn!(%error, "dropping unsafe next path on sign-in");
            None
        }
    }
}

/// Email a one-time sign-in link.
#[utoipa::path(
    post,
    path = "/auth/magic-link",
    request_body = MagicLinkBody,
    responses(
        (status = 202, description = "Link sent", body = MagicLinkAccepted,
            headers(("Set-Cookie" = String, description = "Session cookie holding the PKCE verifier"))),
        (status = 400, description = "Malformed email or rejected by the provider", body = Error),
        (status = 503, description = "Identity provider unavailable", body = Error)
    ),
    tags = ["auth"],
    operation_id = "requestMagicLink",
    security([])
)]
#[post("/auth/magic-link")]
pub async fn request_magic_link(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<MagicLinkBody>,
) -> ApiResult<HttpResponse> {
    let body = payload.into_inner();
    let next = safe_next(body.next.as_deref());
    let pending = state
        .sign_in
        .request_magic_link(&body.email, next.as_ref())
        .await
        .map_err(|err| {
            if err.code() == crate::domain::ErrorCode::InvalidRequest {
                err.with_details(json!({ "field": "email" }))
            } else {
                err
            }
        })?;
    session.store_code_verifier(&pending.verifier)?;
    Ok(HttpResponse::Accepted().json(MagicLinkAccepted {
        status: "magic_link_sent".to_owned(),
    }))
}

/// Redirect to the provider's consent screen.
#[utoipa::path(
    get,
    path = "/auth/oauth/{provider}",
    params(
        ("provider" = String, Path, description = "OAuth provider, e.g. `google`"),
        OAuthQuery
    ),
    responses(
        (status = 303, description = "Redirect to the provider"),
        (status = 404, description = "Unsupported provider", body = Error)
    ),
    tags = ["auth"],
    operation_id = "startOAuth",
    security([])
)]
#[get("/auth/oauth/{provider}")]
pub async fn start_oauth(
    state: web::Data<HttpState>,
    session: SessionContext,
    provider: web::Path<String>,
    query: web::Query<OAuthQuery>,
) -> ApiResult<HttpResponse> {
    let provider: OAuthProvider = provider
        .parse()
        .map_err(|err| Error::not_found(format!("{err}")))?;
    let next = safe_next(query.next.as_deref());
    let pending = state.sign_in.oauth_redirect(provider, next.as_ref())?;
    let target = pending
        .redirect
        .ok_or_else(|| Error::internal("provider returned no authorisation URL"))?;
    session.store_code_verifier(&pending.verifier)?;
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, target.as_str()))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish())
}
