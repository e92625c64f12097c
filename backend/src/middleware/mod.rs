//! Request middleware.
//!
//! Purpose: request lifecycle concerns shared by every auth entry point.

pub mod trace;

pub use trace::Trace;
