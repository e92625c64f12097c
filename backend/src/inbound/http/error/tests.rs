//! Tests for HTTP error mapping.

use super::*;
use crate::domain::Error;
use actix_web::ResponseError;
use actix_web::body::to_bytes;
use actix_web::http::StatusCode;
use rstest::{fixture, rstest};
use rstest_bdd_macros::{given, then, when};
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn leaky_internal_error() -> Error {
    Error::internal("supabase anon key rejected")
        .with_trace_id(TRACE_ID)
        .with_details(json!({"upstream": "https://abcd.supabase.co"}))
}

#[rstest]
#[case(Error::invalid_request("bad email"), StatusCode::BAD_REQUEST)]
#[case(Error::unauthorized("login required"), StatusCode::UNAUTHORIZED)]
#[case(Error::not_found("unknown provider"), StatusCode::NOT_FOUND)]
#[case(Error::gateway_timeout("sign-in timed out"), StatusCode::GATEWAY_TIMEOUT)]
#[case(Error::service_unavailable("auth API down"), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] error: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&error), status);
}

async fn decode_response(error: &Error) -> (StatusCode, Option<String>, Error) {
    let response = ResponseError::error_response(error);
    let status = response.status();
    let trace = response
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    let payload = serde_json::from_slice(&bytes).expect("Error JSON deserialisation succeeds");
    (status, trace, payload)
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted_but_keep_trace_id(leaky_internal_error: Error) {
    let (status, trace, payload) = decode_response(&leaky_internal_error).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(trace.as_deref(), Some(TRACE_ID));
    assert_eq!(payload.message(), "Internal server error");
    assert!(payload.details().is_none());
}

#[rstest]
#[actix_web::test]
async fn client_errors_keep_their_details() {
    let error = Error::invalid_request("email must not be empty")
        .with_details(json!({"field": "email"}));
    let (status, trace, payload) = decode_response(&error).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(trace.is_none());
    assert_eq!(payload.message(), "email must not be empty");
    assert_eq!(payload.details(), Some(&json!({"field": "email"})));
}

#[given("a gateway timeout error code")]
fn a_gateway_timeout_error_code() -> ErrorCode {
    ErrorCode::GatewayTimeout
}

#[when("the adapter maps the code to an HTTP status")]
fn the_adapter_maps_the_code(code: ErrorCode) -> StatusCode {
    super::status_for(code)
}

#[then("the status is 504 Gateway Timeout")]
fn the_status_is_504(status: StatusCode) {
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}

#[rstest]
fn gateway_timeouts_map_to_504() {
    let code = a_gateway_timeout_error_code();
    let status = the_adapter_maps_the_code(code);
    the_status_is_504(status);
}

#[test]
fn from_actix_error_is_redacted_internal_error() {
    let err: Error = actix_web::error::ErrorBadRequest("boom").into();
    assert_eq!(err.code(), ErrorCode::InternalError);
    assert_eq!(err.message(), "Internal server error");
    assert_eq!(err.details(), None);
}
