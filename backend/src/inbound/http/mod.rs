//! HTTP inbound adapter exposing the auth entry points.

pub mod auth;
pub mod error;
pub mod feed;
pub mod health;
pub mod responses;
pub mod session;
pub mod session_config;
pub mod sign_in;
pub mod state;
#[cfg(test)]
pub mod test_utils;
