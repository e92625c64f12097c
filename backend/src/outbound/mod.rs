//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **supabase**: reqwest clients for the hosted auth API, the `profiles`
//!   table, and the subscription status edge function
//! - **events**: in-process auth event hub backing the listener signal
//!
//! Adapters are thin translators between wire shapes and domain types. They
//! contain no routing decisions.

pub mod events;
pub mod supabase;
