//! User identity as issued by the identity provider.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Validation errors returned by [`UserId::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserIdValidationError {
    /// The identifier was blank once trimmed.
    #[error("user id must not be empty")]
    Empty,
}

/// Opaque identifier of an authenticated user.
///
/// ## Invariants
/// - Never blank; surrounding whitespace is trimmed.
///
/// # Examples
/// ```
/// use session_gate::domain::UserId;
///
/// let id = UserId::new(" 8f14e45f-ceea-467f-a0e6-1b8f2b1a4c9d ").expect("valid id");
/// assert_eq!(id.as_ref(), "8f14e45f-ceea-467f-a0e6-1b8f2b1a4c9d");
/// assert_eq!(id.short_form(), "8f14e45f...");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and construct a [`UserId`].
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserIdValidationError> {
        let trimmed = id.as_ref().trim();
        if trimmed.is_empty() {
            return Err(UserIdValidationError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// First eight characters followed by an ellipsis, for diagnostics.
    #[must_use]
    pub fn short_form(&self) -> String {
        let prefix: String = self.0.chars().take(8).collect();
        format!("{prefix}...")
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = UserIdValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}
