//! Session lifecycle and backend-routing protocol for the AImee voice agent.
//!
//! The room transport and the media pipelines (audio, STT, TTS) live in the
//! external real-time SDK; this crate owns the logic around them:
//! classifying a join as a fresh visit or a reconnection after a brief
//! interruption, keeping exactly one conversational session per connected
//! participant, and deciding per utterance whether the backend router or
//! the local model produces the reply, never both.

pub mod error;
pub mod registry;
pub mod supervisor;
pub mod transport;
pub mod turn;

pub use error::SessionError;
pub use registry::{RoomRegistry, RoomSessionRecord, SessionOrigin, RECONNECT_WINDOW};
pub use supervisor::SessionSupervisor;
pub use transport::{ConversationSession, SessionFactory};
pub use turn::{BackendRoutedTurnHandler, DirectTurnHandler, TurnDisposition, TurnHandler};
