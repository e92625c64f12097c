//! Driven port for reading a user's profile row.

use async_trait::async_trait;

use crate::domain::{AccessToken, Profile, Role, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by profile store adapters.
    pub enum ProfileStoreError {
        /// Store could not be reached.
        Connection { message: String } => "profile store connection failed: {message}",
        /// Query failed or returned an unreadable row.
        Query { message: String } => "profile store query failed: {message}",
    }
}

/// Port for the profile table, read with the user's own credentials.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Profile for `user_id`, or `None` when no row exists yet.
    async fn fetch_profile(
        &self,
        user_id: &UserId,
        access_token: &AccessToken,
    ) -> Result<Option<Profile>, ProfileStoreError>;
}

/// Fixture store returning an onboarded founder for every user.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureProfileStore;

#[async_trait]
impl ProfileStore for FixtureProfileStore {
    async fn fetch_profile(
        &self,
        _user_id: &UserId,
        _access_token: &AccessToken,
    ) -> Result<Option<Profile>, ProfileStoreError> {
        Ok(Some(Profile::new(Some(Role::Founder), true)))
    }
}
