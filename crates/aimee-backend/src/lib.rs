//! HTTP routing client for the AImee backend multi-agent system.
//!
//! The voice agent can route user utterances through a remote multi-agent
//! router instead of the local model. This crate owns that HTTP contract:
//! pooled connections, a bounded request timeout, and classification of
//! every failure mode into a [`aimee_types::BackendResponse`] the caller
//! can act on. No retries happen here; the caller decides what a failure
//! means (in practice: fall back to local generation).

pub mod client;
pub mod config;

pub use client::RouterClient;
pub use config::BackendConfig;
