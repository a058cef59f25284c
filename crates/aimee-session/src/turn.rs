//! Per-utterance routing between the backend router and the local model.

use std::sync::Arc;

use aimee_backend::RouterClient;
use async_trait::async_trait;
use serde_json::json;

use crate::transport::ConversationSession;

/// What a turn handler did with an utterance.
///
/// Consumed by the session driver: `Handled` means a reply was already
/// delivered and default local generation must not run for this turn;
/// `PassThrough` means the driver continues with the local model. Exactly
/// one of the two paths speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDisposition {
    Handled,
    PassThrough,
}

/// Hook invoked when speech recognition completes a user turn.
///
/// The variant is chosen once, at session construction time.
#[async_trait]
pub trait TurnHandler: Send + Sync {
    async fn on_user_turn_completed(
        &self,
        session: &dyn ConversationSession,
        text: &str,
    ) -> TurnDisposition;
}

/// Pass-through handler: every turn goes to the local model.
#[derive(Debug, Default)]
pub struct DirectTurnHandler;

#[async_trait]
impl TurnHandler for DirectTurnHandler {
    async fn on_user_turn_completed(
        &self,
        _session: &dyn ConversationSession,
        _text: &str,
    ) -> TurnDisposition {
        TurnDisposition::PassThrough
    }
}

/// Routes each turn through the backend multi-agent router, falling back
/// to the local model whenever the backend cannot answer.
///
/// No retries: a single failed call means this turn is handled locally.
pub struct BackendRoutedTurnHandler {
    client: Arc<RouterClient>,
    user_id: String,
}

impl BackendRoutedTurnHandler {
    pub fn new(client: Arc<RouterClient>, user_id: impl Into<String>) -> Self {
        Self {
            client,
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl TurnHandler for BackendRoutedTurnHandler {
    async fn on_user_turn_completed(
        &self,
        session: &dyn ConversationSession,
        text: &str,
    ) -> TurnDisposition {
        let response = self
            .client
            .chat(&self.user_id, text, json!({"mode": "voice", "source": "livekit"}))
            .await;

        if !response.success {
            tracing::warn!(
                agent = %response.agent,
                error = response.error.as_deref().unwrap_or(""),
                "backend could not handle turn, falling back to local generation"
            );
            return TurnDisposition::PassThrough;
        }

        tracing::info!(agent = %response.agent, "backend handled turn");
        match session.say(&response.response, true, true).await {
            Ok(()) => TurnDisposition::Handled,
            Err(e) => {
                tracing::warn!(
                    "failed to speak backend reply, falling back to local generation: {}",
                    e
                );
                TurnDisposition::PassThrough
            }
        }
    }
}
