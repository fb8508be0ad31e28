//! Graph-store REST client.
//!
//! Every update is guarded by the resource's revision token: callers fetch the
//! resource immediately before patching it, and a stale token surfaces as
//! [`chatpulse_core::ChatPulseError::StaleRevision`].

pub mod client;

pub use client::GraphStoreClient;
