//! One-shot settlement cell.
//!
//! A resolution run may see several signals race to a terminal state. The
//! cell records the first and rejects the rest, so callers never act twice.

use std::sync::OnceLock;

/// Returned when a second terminal value is offered; hands the value back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("settlement already recorded")]
pub struct AlreadySettled<T>(pub T);

/// Write-once terminal state shared by every signal of one run.
///
/// # Examples
/// ```
/// use session_gate::domain::Settlement;
///
/// let cell = Settlement::new();
/// assert!(cell.settle("first").is_ok());
/// assert!(cell.settle("second").is_err());
/// assert_eq!(cell.get(), Some(&"first"));
/// ```
#[derive(Debug)]
pub struct Settlement<T> {
    cell: OnceLock<T>,
}

impl<T> Default for Settlement<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Settlement<T> {
    /// Empty, unsettled cell.
    pub fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Record `value` unless a value is already present.
    pub fn settle(&self, value: T) -> Result<(), AlreadySettled<T>> {
        self.cell.set(value).map_err(AlreadySettled)
    }

    /// Settled value, if any.
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Whether a terminal value has been recorded.
    pub fn is_settled(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Consume the cell, yielding the settled value.
    pub fn into_inner(self) -> Option<T> {
        self.cell.into_inner()
    }
}
