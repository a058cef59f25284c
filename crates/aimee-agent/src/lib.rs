//! AImee LiveKit voice agent worker.
//!
//! Joins a LiveKit room as the agent participant, greets the user, routes
//! recognized utterances either through the backend multi-agent router or
//! the local model, and survives brief participant disconnects by creating
//! a fresh session for the reconnecting user.

pub mod agent;
pub mod config;
pub mod livekit;
pub mod prompts;
pub mod worker;
