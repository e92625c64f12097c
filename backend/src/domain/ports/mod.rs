//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod identity_provider;
mod navigator;
mod profile_store;
mod subscription_status;

#[cfg(test)]
pub use identity_provider::MockIdentityProvider;
pub use identity_provider::{
    AuthEventStream, ClientContext, FixtureIdentityProvider, FlowId, IdentityProvider,
    IdentityProviderError,
};
#[cfg(test)]
pub use navigator::MockNavigator;
pub use navigator::{Navigator, NavigatorError, OneShotNavigator};
#[cfg(test)]
pub use profile_store::MockProfileStore;
pub use profile_store::{FixtureProfileStore, ProfileStore, ProfileStoreError};
#[cfg(test)]
pub use subscription_status::MockSubscriptionStatusQuery;
pub use subscription_status::{
    FixtureSubscriptionStatusQuery, SubscriptionStatusError, SubscriptionStatusQuery,
};
