//! Driven port for the billing subscription status lookup.

use async_trait::async_trait;

use crate::domain::Session;

use super::define_port_error;

define_port_error! {
    /// Errors raised by subscription status adapters.
    pub enum SubscriptionStatusError {
        /// Billing backend could not be reached.
        Transport { message: String } => "subscription status transport failed: {message}",
        /// Billing backend returned an unreadable answer.
        Decode { message: String } => "subscription status response invalid: {message}",
    }
}

/// Port returning the raw billing status string for the signed-in account.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionStatusQuery: Send + Sync {
    /// Raw status (`active`, `trialing`, `canceled`, ...), or `None` when the
    /// account has no billing record.
    async fn fetch_status(&self, session: &Session)
    -> Result<Option<String>, SubscriptionStatusError>;
}

/// Fixture query reporting every account as active.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSubscriptionStatusQuery;

#[async_trait]
impl SubscriptionStatusQuery for FixtureSubscriptionStatusQuery {
    async fn fetch_status(
        &self,
        _session: &Session,
    ) -> Result<Option<String>, SubscriptionStatusError> {
        Ok(Some("active".to_owned()))
    }
}
