//! Rendering of flow outcomes as HTTP responses.
//!
//! Every navigation becomes a `303 See Other` so the browser performs a full
//! document load. Auth responses are never cached. Diagnostics are attached
//! only when the request opted in with `debug=1`.

use actix_web::http::{StatusCode, header};
use actix_web::{HttpResponse, HttpResponseBuilder};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::domain::ports::OneShotNavigator;
use crate::domain::{
    DebugSnapshot, Error, FlowFailure, FlowOutcome, FlowReport, Navigation, RedirectReason,
    ResolutionFailure,
};

/// Response header naming the branch that fired, sent in debug mode only.
pub const REDIRECT_REASON_HEADER: &str = "x-redirect-reason";

const NO_STORE: &str = "no-store";

/// Body of a redirect answered in debug mode.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedirectBody {
    /// Same value as the `Location` header.
    pub location: String,
    /// Flow diagnostics.
    pub debug: DebugSnapshot,
}

/// The single recovery offered with a failure.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecoveryActionBody {
    #[schema(example = "Request a new link")]
    pub label: String,
    #[schema(example = "/auth")]
    pub href: String,
}

/// Visible sign-in failure.
#[derive(Debug, Serialize, ToSchema)]
pub struct FailureBody {
    pub reason: RedirectReason,
    #[schema(example = "This sign-in link is invalid or has already been used.")]
    pub message: String,
    pub action: RecoveryActionBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugSnapshot>,
}

/// Login page state when nobody is signed in.
#[derive(Debug, Serialize, ToSchema)]
pub struct SignedOutBody {
    #[schema(example = "signed_out")]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugSnapshot>,
}

fn no_store(status: StatusCode) -> HttpResponseBuilder {
    let mut builder = HttpResponse::build(status);
    builder.insert_header((header::CACHE_CONTROL, NO_STORE));
    builder
}

/// Hard redirect to `navigation`, with diagnostics when `debug` is present.
pub fn see_other(navigation: &Navigation, debug: Option<DebugSnapshot>) -> HttpResponse {
    let mut builder = no_store(StatusCode::SEE_OTHER);
    builder.insert_header((header::LOCATION, navigation.target()));
    match debug {
        Some(snapshot) => {
            builder.insert_header((REDIRECT_REASON_HEADER, navigation.reason().as_str()));
            builder.json(RedirectBody {
                location: navigation.target().to_owned(),
                debug: snapshot,
            })
        }
        None => builder.finish(),
    }
}

fn failure_status(reason: ResolutionFailure) -> StatusCode {
    match reason {
        ResolutionFailure::ExchangeFailed => StatusCode::UNAUTHORIZED,
        ResolutionFailure::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ResolutionFailure::AuthFailed => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Failure payload with its one recovery action.
pub fn failure(failure: &FlowFailure, debug: Option<DebugSnapshot>) -> HttpResponse {
    let mut builder = no_store(failure_status(failure.reason));
    if debug.is_some() {
        builder.insert_header((
            REDIRECT_REASON_HEADER,
            failure.reason.redirect_reason().as_str(),
        ));
    }
    builder.json(FailureBody {
        reason: failure.reason.redirect_reason(),
        message: failure.message.to_owned(),
        action: RecoveryActionBody {
            label: failure.recovery.label.to_owned(),
            href: failure.recovery.href.clone(),
        },
        debug,
    })
}

/// Render an auth flow report for `route`.
///
/// # Errors
///
/// Returns an internal error when the navigator refused the flow's
/// navigation and recorded none of its own.
pub fn flow_response(
    report: &FlowReport,
    navigator: &OneShotNavigator,
    route: &str,
    debug: bool,
) -> Result<HttpResponse, Error> {
    let snapshot = debug.then(|| DebugSnapshot::from_flow(route, report));
    match &report.outcome {
        FlowOutcome::Navigated(navigation) => Ok(see_other(navigation, snapshot)),
        FlowOutcome::SignedOut => Ok(no_store(StatusCode::OK).json(SignedOutBody {
            status: "signed_out".to_owned(),
            debug: snapshot,
        })),
        FlowOutcome::Failed(flow_failure) => Ok(failure(flow_failure, snapshot)),
        FlowOutcome::Suppressed(refusal) => match navigator.navigation() {
            Some(navigation) => Ok(see_other(navigation, snapshot)),
            None => {
                error!(%refusal, route, "navigation suppressed with nothing recorded");
                Err(Error::internal(format!("navigation suppressed: {refusal}")))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{Navigator, NavigatorError};
    use actix_web::body::to_bytes;
    use rstest::rstest;
    use std::time::Duration;

    fn report(outcome: FlowOutcome) -> FlowReport {
        FlowReport {
            outcome,
            settled_by: None,
            elapsed: Duration::from_millis(120),
            session: None,
        }
    }

    async fn json_body(response: HttpResponse) -> serde_json::Value {
        let bytes = to_bytes(response.into_body()).await.expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[rstest]
    #[actix_web::test]
    async fn navigation_is_a_bare_see_other_without_debug() {
        let navigation = Navigation::new("/feed", RedirectReason::Feed);
        let response = see_other(&navigation, None);
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
            Some("/feed")
        );
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).and_then(|v| v.to_str().ok()),
            Some("no-store")
        );
        assert!(response.headers().get(REDIRECT_REASON_HEADER).is_none());
        let bytes = to_bytes(response.into_body()).await.expect("body");
        assert!(bytes.is_empty());
    }

    #[rstest]
    #[actix_web::test]
    async fn debug_redirect_carries_reason_and_snapshot() {
        let navigation = Navigation::new("/journalist/dashboard?debug=1", RedirectReason::Journalist);
        let flow = report(FlowOutcome::Navigated(navigation.clone()));
        let navigator = OneShotNavigator::new();
        let response =
            flow_response(&flow, &navigator, "/auth/callback", true).expect("response");
        assert_eq!(
            response.headers().get(REDIRECT_REASON_HEADER).and_then(|v| v.to_str().ok()),
            Some("journalist")
        );
        let body = json_body(response).await;
        assert_eq!(body["location"], "/journalist/dashboard?debug=1");
        assert_eq!(body["debug"]["lastRedirectReason"], "journalist");
        assert_eq!(body["debug"]["elapsedMs"], 120);
    }

    #[rstest]
    #[case(ResolutionFailure::ExchangeFailed, StatusCode::UNAUTHORIZED, "exchange_failed")]
    #[case(ResolutionFailure::Timeout, StatusCode::GATEWAY_TIMEOUT, "timeout")]
    #[case(ResolutionFailure::AuthFailed, StatusCode::SERVICE_UNAVAILABLE, "auth_failed")]
    #[actix_web::test]
    async fn failures_offer_one_recovery_action(
        #[case] reason: ResolutionFailure,
        #[case] status: StatusCode,
        #[case] wire: &str,
    ) {
        let response = failure(&FlowFailure::new(reason, "/auth"), None);
        assert_eq!(response.status(), status);
        let body = json_body(response).await;
        assert_eq!(body["reason"], wire);
        assert_eq!(body["action"]["label"], "Request a new link");
        assert_eq!(body["action"]["href"], "/auth");
        assert!(body.get("debug").is_none());
    }

    #[rstest]
    #[actix_web::test]
    async fn suppressed_flow_falls_back_to_recorded_navigation() {
        let navigator = OneShotNavigator::new();
        navigator
            .navigate(Navigation::new("/feed", RedirectReason::Feed))
            .expect("first navigation");
        let flow = report(FlowOutcome::Suppressed(NavigatorError::already_navigated()));
        let response = flow_response(&flow, &navigator, "/auth/callback", false).expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[rstest]
    fn suppressed_flow_without_navigation_is_internal() {
        let flow = report(FlowOutcome::Suppressed(NavigatorError::detached()));
        let err = flow_response(&flow, &OneShotNavigator::new(), "/auth", false)
            .expect_err("nothing to render");
        assert_eq!(err.code(), crate::domain::ErrorCode::InternalError);
    }
}
