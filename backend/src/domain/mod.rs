//! Domain primitives and services for session resolution.
//!
//! Purpose: keep the sign-in flow transport-agnostic. Types here carry their
//! invariants (validated ids, redacted tokens, same-origin redirect targets)
//! and services talk to the outside world only through [`ports`].
//!
//! Public surface:
//! - Error / ErrorCode: API error payload and stable identifiers.
//! - SessionResolver: first-resolved-wins session resolution under a deadline.
//! - ProfileGate / RouteDispatcher: post-sign-in classification and navigation.
//! - AuthFlow: the three composed for one request.
//! - FeedGuard: feed entry re-validation.
//! - SignInService: magic link and OAuth initiation.

pub mod ports;

mod auth_flow;
mod callback_request;
mod debug_snapshot;
pub mod error;
mod feed_guard;
mod flow_log;
mod profile;
mod profile_gate;
pub mod race;
mod redirect;
mod route_dispatcher;
mod session;
mod session_resolver;
mod settlement;
mod sign_in;
mod subscription;
pub mod trace_id;
mod user;

pub use self::auth_flow::{
    AuthFlow, FlowFailure, FlowHandle, FlowOutcome, FlowReport, RecoveryAction,
};
pub use self::callback_request::{CallbackParams, HashTokens};
pub use self::debug_snapshot::DebugSnapshot;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::feed_guard::{FeedAccess, FeedGuard, FeedReport};
pub use self::profile::{Profile, Role, UnknownRoleError};
pub use self::profile_gate::{GateDecision, ProfileGate, decide};
pub use self::redirect::{Destinations, Navigation, NextPath, NextPathError, RedirectReason};
pub use self::route_dispatcher::RouteDispatcher;
pub use self::session::{AccessToken, AuthEvent, AuthEventKind, Session};
pub use self::session_resolver::{
    Resolution, ResolutionFailure, ResolutionMode, ResolutionOutcome, ResolutionRequest,
    ResolverTimings, SessionResolver, SignalName,
};
pub use self::settlement::{AlreadySettled, Settlement};
pub use self::sign_in::{
    CodeVerifier, EmailAddress, EmailAddressError, MagicLinkRequest, OAuthProvider, OAuthRequest,
    PendingSignIn, SignInService, UnsupportedProviderError,
};
pub use self::subscription::{SubscriptionState, classify_status};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{UserId, UserIdValidationError};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use session_gate::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::unauthorized("sign in first"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
