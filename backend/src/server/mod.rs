//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::ServerConfig;

use state_builders::build_http_state;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use session_gate::Trace;
#[cfg(debug_assertions)]
use session_gate::doc::ApiDoc;
use session_gate::inbound::http::auth::{callback, session_status};
use session_gate::inbound::http::feed::feed;
use session_gate::inbound::http::health::{HealthState, live, ready};
use session_gate::inbound::http::sign_in::{request_magic_link, start_oauth};
use session_gate::inbound::http::state::HttpState;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        key,
        cookie_secure,
        same_site,
    } = deps;

    // Private content keeps the PKCE verifier and access token unreadable
    // client-side.
    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(1)),
        )
        .build();

    let auth = web::scope("")
        .wrap(session)
        .service(callback)
        .service(session_status)
        .service(request_magic_link)
        .service(start_oauth)
        .service(feed);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app.service(auth)
}

/// Construct the HTTP server.
///
/// # Errors
///
/// Propagates [`std::io::Error`] when adapters cannot be wired or the socket
/// cannot be bound.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let ServerConfig {
        key,
        cookie_secure,
        same_site,
        bind_addr,
        settings,
    } = config;
    let http_state = build_http_state(&settings)?;
    let server_health_state = health_state.clone();

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            key: key.clone(),
            cookie_secure,
            same_site,
        })
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::{StatusCode, header};
    use actix_web::test;
    use rstest::{fixture, rstest};

    use super::*;
    use session_gate::inbound::http::state::{FlowSettings, HttpStatePorts};
    use session_gate::settings::GatewaySettings;
    use session_gate::test_support::{ScriptedIdentity, ScriptedProfiles, ScriptedSubscription};

    fn settings(supabase_url: Option<&str>) -> GatewaySettings {
        GatewaySettings {
            supabase_url: supabase_url.map(str::to_owned),
            supabase_anon_key: Some("anon-key".to_owned()),
            site_url: Some("https://app.example.com".to_owned()),
            bind_addr: Some("127.0.0.1:0".to_owned()),
            callback_timeout_ms: 8_000,
            hydration_timeout_ms: 1_500,
            hash_grace_ms: 500,
            http_timeout_ms: 10_000,
            flow_session_ttl_secs: 60,
        }
    }

    #[fixture]
    fn deps() -> AppDependencies {
        let http_state = web::Data::new(HttpState::new(
            HttpStatePorts {
                identity: Arc::new(ScriptedIdentity::new()),
                profiles: Arc::new(ScriptedProfiles::new()),
                subscriptions: Arc::new(ScriptedSubscription::status("active")),
            },
            FlowSettings {
                timings: Default::default(),
                destinations: Default::default(),
                site_url: url::Url::parse("https://app.example.com").expect("site url"),
            },
        ));
        let health_state = web::Data::new(HealthState::new());
        health_state.mark_ready();
        AppDependencies {
            health_state,
            http_state,
            key: Key::generate(),
            cookie_secure: true,
            same_site: SameSite::Lax,
        }
    }

    #[rstest]
    #[actix_web::test]
    async fn app_serves_health_probes(deps: AppDependencies) {
        let app = test::init_service(build_app(deps)).await;

        for uri in ["/health/ready", "/health/live"] {
            let res = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(res.status(), StatusCode::OK, "{uri}");
        }
    }

    #[rstest]
    #[actix_web::test]
    async fn sign_in_routes_store_pkce_state_in_a_hardened_cookie(deps: AppDependencies) {
        let app = test::init_service(build_app(deps)).await;

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/auth/oauth/google").to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert!(res.headers().contains_key(header::LOCATION));
        let cookie = res
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .expect("session cookie");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert!(!cookie.value().contains("pkce_verifier"));
    }

    #[rstest]
    #[actix_web::test]
    async fn create_server_binds_and_reports_ready() {
        let health_state = web::Data::new(HealthState::new());
        let server = create_server(
            health_state.clone(),
            ServerConfig::new(
                Key::generate(),
                false,
                SameSite::Lax,
                "127.0.0.1:0".parse().expect("socket address"),
                settings(Some("https://project.supabase.co")),
            ),
        )
        .expect("server starts");
        assert!(health_state.is_ready());

        let handle = server.handle();
        let running = actix_web::rt::spawn(server);
        handle.stop(false).await;
        running
            .await
            .expect("server task")
            .expect("server shuts down cleanly");
    }

    #[rstest]
    #[actix_web::test]
    async fn create_server_rejects_missing_supabase_project() {
        let health_state = web::Data::new(HealthState::new());
        let Err(error) = create_server(
            health_state.clone(),
            ServerConfig::new(
                Key::generate(),
                false,
                SameSite::Lax,
                "127.0.0.1:0".parse().expect("socket address"),
                settings(None),
            ),
        ) else {
            panic!("server must not start without a Supabase project");
        };

        assert_eq!(error.kind(), std::io::ErrorKind::InvalidInput);
        assert!(!health_state.is_ready());
    }
}
