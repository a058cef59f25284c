//! The narrow surface of the external conversational transport.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SessionError;
use crate::registry::SessionOrigin;

/// One conversational session bound to the external room transport.
///
/// The real-time SDK owns the room, audio tracks, and the STT/TTS
/// pipelines; this trait is the slice of its session object the routing
/// protocol needs.
#[async_trait]
pub trait ConversationSession: Send + Sync {
    /// Starts the session, resolving once the transport reports it running.
    async fn start(self: Arc<Self>) -> Result<(), SessionError>;

    /// Speaks pre-rendered text through the session's TTS path.
    async fn say(
        &self,
        text: &str,
        interruptible: bool,
        add_to_history: bool,
    ) -> Result<(), SessionError>;

    /// Asks the local model to produce the reply for the current turn,
    /// optionally steered by one-off instructions.
    async fn generate_reply(&self, instructions: Option<&str>) -> Result<(), SessionError>;

    /// Closes the session and fires the agent's exit hook. Idempotent.
    async fn close(&self);
}

/// Builds a transport-bound session and agent pair for a room.
///
/// Invoked by the lifecycle supervisor for the initial session and again
/// for every reconnection; `origin` is carried into the agent so greetings
/// differ between a first visit and a resumed one.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn build(&self, origin: SessionOrigin)
        -> Result<Arc<dyn ConversationSession>, SessionError>;
}
