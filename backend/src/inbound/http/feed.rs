//! Feed entry point.
//!
//! ```text
//! GET /feed?debug=1
//! ```
//!
//! Re-validates session, onboarding, role, and billing on every visit and
//! either admits the browser or hard-redirects it to the right place.

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, get, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    ApiResult, CallbackParams, DebugSnapshot, FeedAccess, RedirectReason, Role, SubscriptionState,
};
use crate::inbound::http::responses::{RedirectBody, see_other};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

const FEED_ROUTE: &str = "/feed";

/// Admission to the feed.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedAdmission {
    #[schema(example = "allowed")]
    pub status: String,
    pub role: Role,
    pub subscription: SubscriptionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugSnapshot>,
}

/// Admit a founder, agency, or admin with live billing; redirect everyone else.
#[utoipa::path(
    get,
    path = "/feed",
    params(("debug" = Option<String>, Query, description = "`1` attaches diagnostics")),
    responses(
        (status = 200, description = "Feed access granted", body = FeedAdmission),
        (status = 303, description = "Redirect to login, onboarding, dashboard, or plan selection", body = RedirectBody)
    ),
    tags = ["feed"],
    operation_id = "feedAccess",
    security([])
)]
#[get("/feed")]
pub async fn feed(
    req: HttpRequest,
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let debug = CallbackParams::from_query(req.query_string()).debug();
    let client = session.client_context()?;
    let report = state.feed_guard.revalidate(&client, debug).await;
    let snapshot = debug.then(|| DebugSnapshot::from_feed(FEED_ROUTE, &report));

    match &report.access {
        FeedAccess::Allowed { role } => Ok(HttpResponse::Ok()
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .json(FeedAdmission {
                status: "allowed".to_owned(),
                role: *role,
                subscription: report.subscription,
                debug: snapshot,
            })),
        FeedAccess::Redirect(navigation) => {
            if navigation.reason() == RedirectReason::NoSession {
                session.clear_access_token();
            }
            Ok(see_other(navigation, snapshot))
        }
    }
}
