//! Shared value types for the AImee voice agent.
//!
//! Holds the wire types of the backend router HTTP contract and the
//! participant events consumed from the room transport. Kept free of any
//! I/O so every other crate can depend on it.

pub mod backend;
pub mod events;

pub use backend::{ArrivalRequest, BackendResponse, ChatRequest, GeoPoint};
pub use events::RoomEvent;
