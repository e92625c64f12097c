//! Gateway entry-point: loads configuration, wires adapters, serves auth routes.

mod server;

use actix_web::web;
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use session_gate::inbound::http::health::HealthState;
use session_gate::inbound::http::session_config::{BuildMode, session_settings_from_env};
use session_gate::settings::GatewaySettings;

use server::{ServerConfig, create_server};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = GatewaySettings::load().map_err(|e| std::io::Error::other(e.to_string()))?;
    let env = DefaultEnv::new();
    let session = session_settings_from_env(&env, BuildMode::from_debug_assertions())
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let bind_addr = settings
        .bind_addr()
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(
        health_state.clone(),
        ServerConfig::new(
            session.key,
            session.cookie_secure,
            session.same_site,
            bind_addr,
            settings,
        ),
    )?;
    info!(%bind_addr, "session gate listening");

    let result = server.await;
    health_state.mark_unhealthy();
    result
}
