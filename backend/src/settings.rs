//! Gateway configuration loaded via OrthoConfig.
//!
//! Values come from `SESSION_GATE_*` environment variables, CLI flags, or a
//! config file, in OrthoConfig's usual precedence. Durations are given in
//! milliseconds (seconds for the flow cache TTL).

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::ResolverTimings;
use crate::outbound::supabase::SupabaseConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SITE_URL: &str = "http://localhost:8080";

/// Errors raised while turning raw settings into typed configuration.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("missing required setting: {name}")]
    Missing { name: &'static str },
    #[error("invalid URL for {name}: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Raw gateway settings.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SESSION_GATE")]
pub struct GatewaySettings {
    /// Supabase project URL.
    pub supabase_url: Option<String>,
    /// Supabase anon key.
    pub supabase_anon_key: Option<String>,
    /// Public origin of the site, used for callback URLs.
    pub site_url: Option<String>,
    /// Listen address.
    pub bind_addr: Option<String>,
    /// Callback resolution deadline.
    #[ortho_config(default = 8000)]
    pub callback_timeout_ms: u64,
    /// Login page hydration deadline.
    #[ortho_config(default = 1500)]
    pub hydration_timeout_ms: u64,
    /// Wait before re-checking after fragment tokens arrive.
    #[ortho_config(default = 500)]
    pub hash_grace_ms: u64,
    /// Per-request timeout for Supabase calls.
    #[ortho_config(default = 10000)]
    pub http_timeout_ms: u64,
    /// How long a confirmed session stays visible to sibling requests.
    #[ortho_config(default = 60)]
    pub flow_session_ttl_secs: u64,
}

impl GatewaySettings {
    /// Resolver deadlines.
    pub fn timings(&self) -> ResolverTimings {
        ResolverTimings {
            callback_timeout: Duration::from_millis(self.callback_timeout_ms),
            hydration_timeout: Duration::from_millis(self.hydration_timeout_ms),
            hash_grace: Duration::from_millis(self.hash_grace_ms),
        }
    }

    /// TTL of the auth event hub's session cache.
    pub fn flow_session_ttl(&self) -> Duration {
        Duration::from_secs(self.flow_session_ttl_secs)
    }

    /// Socket to listen on.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value
            .parse()
            .map_err(|source| SettingsError::InvalidBindAddr {
                value: value.to_owned(),
                source,
            })
    }

    /// Public origin for callback URLs.
    pub fn site_url(&self) -> Result<Url, SettingsError> {
        let raw = self.site_url.as_deref().unwrap_or(DEFAULT_SITE_URL);
        Url::parse(raw).map_err(|source| SettingsError::InvalidUrl {
            name: "site_url",
            source,
        })
    }

    /// Supabase connection settings.
    pub fn supabase(&self) -> Result<SupabaseConfig, SettingsError> {
        let raw_url = self
            .supabase_url
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .ok_or(SettingsError::Missing {
                name: "supabase_url",
            })?;
        let anon_key = self
            .supabase_anon_key
            .clone()
            .filter(|value| !value.trim().is_empty())
            .ok_or(SettingsError::Missing {
                name: "supabase_anon_key",
            })?;
        let project_url = Url::parse(raw_url).map_err(|source| SettingsError::InvalidUrl {
            name: "supabase_url",
            source,
        })?;
        Ok(SupabaseConfig {
            project_url,
            anon_key,
            timeout: Duration::from_millis(self.http_timeout_ms),
        })
    }
}
