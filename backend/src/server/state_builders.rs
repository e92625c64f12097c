//! Wiring of Supabase adapters into HTTP state.

use std::sync::Arc;

use actix_web::web;
use mockable::DefaultClock;
use tracing::info;

use session_gate::domain::Destinations;
use session_gate::domain::ports::{IdentityProvider, ProfileStore, SubscriptionStatusQuery};
use session_gate::inbound::http::state::{FlowSettings, HttpState, HttpStatePorts};
use session_gate::outbound::events::AuthEventHub;
use session_gate::outbound::supabase::{
    SupabaseHttp, SupabaseIdentityProvider, SupabaseProfileStore, SupabaseSubscriptionStatus,
};
use session_gate::settings::GatewaySettings;

fn config_error(error: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, error.to_string())
}

/// Build HTTP state backed by the configured Supabase project.
///
/// # Errors
///
/// Returns [`std::io::ErrorKind::InvalidInput`] when settings are missing or
/// malformed, or when the HTTP client cannot be built.
pub(crate) fn build_http_state(settings: &GatewaySettings) -> std::io::Result<web::Data<HttpState>> {
    let supabase = settings.supabase().map_err(config_error)?;
    let site_url = settings.site_url().map_err(config_error)?;
    let project = supabase.project_url.clone();
    let http = SupabaseHttp::new(supabase).map_err(config_error)?;
    let hub = Arc::new(AuthEventHub::new(
        Arc::new(DefaultClock),
        settings.flow_session_ttl(),
    ));

    let identity: Arc<dyn IdentityProvider> =
        Arc::new(SupabaseIdentityProvider::new(http.clone(), hub));
    let profiles: Arc<dyn ProfileStore> = Arc::new(SupabaseProfileStore::new(http.clone()));
    let subscriptions: Arc<dyn SubscriptionStatusQuery> =
        Arc::new(SupabaseSubscriptionStatus::new(http));

    let timings = settings.timings();
    info!(
        project = %project,
        site = %site_url,
        callback_timeout_ms = settings.callback_timeout_ms,
        hydration_timeout_ms = settings.hydration_timeout_ms,
        "auth adapters wired"
    );

    Ok(web::Data::new(HttpState::new(
        HttpStatePorts {
            identity,
            profiles,
            subscriptions,
        },
        FlowSettings {
            timings,
            destinations: Destinations::default(),
            site_url,
        },
    )))
}
