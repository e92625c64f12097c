//! Supabase outbound adapters.
//!
//! Thin reqwest clients for the hosted backend: the GoTrue auth API
//! (identity), the PostgREST `profiles` table, and the
//! `get-subscription-status` edge function. Every request carries the
//! project's anon key in the `apikey` header; user-scoped reads add the
//! user's bearer token so row-level security applies.

mod dto;
mod identity;
mod profiles;
mod subscription;

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};

pub use identity::SupabaseIdentityProvider;
pub use profiles::SupabaseProfileStore;
pub use subscription::SupabaseSubscriptionStatus;

/// Connection settings for one Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://abcd.supabase.co`.
    pub project_url: Url,
    /// Public anon key.
    pub anon_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Shared HTTP plumbing for the Supabase adapters.
#[derive(Debug, Clone)]
pub struct SupabaseHttp {
    client: Client,
    project_url: Url,
    anon_key: String,
}

impl SupabaseHttp {
    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: SupabaseConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            project_url: config.project_url,
            anon_key: config.anon_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.project_url.join(path)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", self.anon_key.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
    }
}

fn status_message(status: StatusCode, body: &[u8]) -> String {
    let body_preview = body_preview(body);
    if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
