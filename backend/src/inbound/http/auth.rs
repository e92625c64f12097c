//! Auth entry point handlers.
//!
//! ```text
//! GET /auth/callback?code=abc123&next=/feed
//! GET /auth/session?debug=1
//! ```
//!
//! The callback runs the full resolution race; the session endpoint backs the
//! login page and only hydrates an existing session. Both answer with a hard
//! redirect, a visible failure, or (session endpoint only) a signed-out body.

use actix_web::{HttpRequest, HttpResponse, get, web};
use tracing::warn;

use crate::domain::ports::OneShotNavigator;
use crate::domain::{ApiResult, CallbackParams, FlowOutcome, FlowReport, ResolutionRequest};
use crate::inbound::http::responses::{FailureBody, RedirectBody, SignedOutBody, flow_response};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

const CALLBACK_ROUTE: &str = "/auth/callback";
const SESSION_ROUTE: &str = "/auth/session";

fn remember_outcome(session: &SessionContext, report: &FlowReport) -> ApiResult<()> {
    match (&report.session, &report.outcome) {
        (Some(confirmed), _) => session.persist_access_token(confirmed.access_token()),
        (None, FlowOutcome::SignedOut | FlowOutcome::Navigated(_)) => {
            session.clear_access_token();
            Ok(())
        }
        (None, _) => Ok(()),
    }
}

async fn run_flow(
    state: &HttpState,
    session: &SessionContext,
    request: ResolutionRequest,
    route: &str,
) -> ApiResult<HttpResponse> {
    let debug = request.params().debug();
    let navigator = OneShotNavigator::new();
    let report = state.auth_flow.run(&request, &navigator).await;
    if let Err(error) = remember_outcome(session, &report) {
        warn!(%error, route, "could not update session cookie after auth flow");
    }
    flow_response(&report, &navigator, route, debug)
}

/// Complete a sign-in from an emailed link or an OAuth provider.
///
/// Accepts `code` (PKCE authorisation code), `next` (root-relative return
/// path), `debug`, and relayed `access_token`/`refresh_token` pairs.
#[utoipa::path(
    get,
    path = "/auth/callback",
    params(
        ("code" = Option<String>, Query, description = "PKCE authorisation code"),
        ("next" = Option<String>, Query, description = "Root-relative return path"),
        ("debug" = Option<String>, Query, description = "`1` attaches diagnostics"),
    ),
    responses(
        (status = 303, description = "Hard redirect to the resolved destination", body = RedirectBody),
        (status = 401, description = "Link invalid or already used", body = FailureBody),
        (status = 504, description = "Sign-in timed out", body = FailureBody)
    ),
    tags = ["auth"],
    operation_id = "authCallback",
    security([])
)]
#[get("/auth/callback")]
pub async fn callback(
    req: HttpRequest,
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let params = CallbackParams::from_query(req.query_string());
    let client = session.client_context()?;
    run_flow(
        &state,
        &session,
        ResolutionRequest::callback(params, client),
        CALLBACK_ROUTE,
    )
    .await
}

/// Hydrate the login page: redirect a signed-in browser onwards.
#[utoipa::path(
    get,
    path = "/auth/session",
    params(
        ("next" = Option<String>, Query, description = "Root-relative return path"),
        ("debug" = Option<String>, Query, description = "`1` attaches diagnostics"),
    ),
    responses(
        (status = 200, description = "Nobody is signed in", body = SignedOutBody),
        (status = 303, description = "Signed in; hard redirect onwards", body = RedirectBody),
        (status = 503, description = "Identity provider unavailable", body = FailureBody),
        (status = 504, description = "Session check timed out", body = FailureBody)
    ),
    tags = ["auth"],
    operation_id = "authSession",
    security([])
)]
#[get("/auth/session")]
pub async fn session_status(
    req: HttpRequest,
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let params = CallbackParams::from_query(req.query_string());
    let client = session.client_context()?;
    run_flow(
        &state,
        &session,
        ResolutionRequest::hydration(params, client),
        SESSION_ROUTE,
    )
    .await
}
