//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every auth entry point, the feed guard, and the
//! health probes, plus the session cookie that carries the PKCE verifier and
//! access token between them. Swagger UI serves it in debug builds.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{DebugSnapshot, Error, ErrorCode, RedirectReason, Role, SubscriptionState};
use crate::inbound::http::feed::FeedAdmission;
use crate::inbound::http::responses::{
    FailureBody, RecoveryActionBody, RedirectBody, SignedOutBody,
};
use crate::inbound::http::sign_in::{MagicLinkAccepted, MagicLinkBody};

struct SessionCookieAddon;

impl Modify for SessionCookieAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Private cookie holding the flow id, PKCE verifier, and access token.",
            ))),
        );
    }
}

/// OpenAPI document for the gateway.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SessionCookieAddon),
    info(
        title = "Session gate API",
        description = "Sign-in callbacks, login hydration, and feed access checks."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::auth::callback,
        crate::inbound::http::auth::session_status,
        crate::inbound::http::sign_in::request_magic_link,
        crate::inbound::http::sign_in::start_oauth,
        crate::inbound::http::feed::feed,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        RedirectReason,
        Role,
        SubscriptionState,
        DebugSnapshot,
        RedirectBody,
        FailureBody,
        RecoveryActionBody,
        SignedOutBody,
        MagicLinkBody,
        MagicLinkAccepted,
        FeedAdmission,
    )),
    tags(
        (name = "auth", description = "Sign-in initiation and completion"),
        (name = "feed", description = "Feed access checks"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
