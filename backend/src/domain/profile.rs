//! Profile state read by the gate: role plus onboarding completion.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role chosen during onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Reporter publishing requests.
    Journalist,
    /// Founder pitching their company.
    Founder,
    /// Agency pitching on behalf of clients.
    Agency,
    /// Staff member.
    Admin,
}

impl Role {
    /// Stored representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Journalist => "journalist",
            Self::Founder => "founder",
            Self::Agency => "agency",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored role is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRoleError(pub String);

impl FromStr for Role {
    type Err = UnknownRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "journalist" => Ok(Self::Journalist),
            "founder" => Ok(Self::Founder),
            "agency" => Ok(Self::Agency),
            "admin" => Ok(Self::Admin),
            _ => Err(UnknownRoleError(s.to_owned())),
        }
    }
}

/// Onboarding-relevant slice of a user's profile.
///
/// A profile with `onboarding_complete = false` routes to onboarding
/// regardless of its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    role: Option<Role>,
    onboarding_complete: bool,
}

impl Profile {
    /// Build a profile snapshot.
    pub fn new(role: Option<Role>, onboarding_complete: bool) -> Self {
        Self {
            role,
            onboarding_complete,
        }
    }

    /// Role, when one has been chosen.
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Whether the onboarding wizard has been completed.
    pub fn is_onboarded(&self) -> bool {
        self.onboarding_complete
    }
}
