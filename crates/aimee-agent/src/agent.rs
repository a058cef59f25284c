//! The AImee conversational agent: greeting, turn dispatch, exit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aimee_backend::RouterClient;
use aimee_session::{ConversationSession, SessionError, SessionOrigin, TurnDisposition, TurnHandler};
use serde_json::json;

/// Pause before the greeting so the mobile app's audio tracks are fully
/// established and the first words are not lost.
const GREETING_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// User identifier reported to the backend for voice sessions.
pub const VOICE_USER_ID: &str = "voice-user";

/// One agent instance per conversational session.
///
/// Carries the session origin so greetings differ between a first visit
/// and a reconnection, and the turn handler variant chosen at
/// construction time.
pub struct VoiceAgent {
    instructions: String,
    origin: SessionOrigin,
    handler: Box<dyn TurnHandler>,
    router: Arc<RouterClient>,
    greeted: AtomicBool,
}

impl VoiceAgent {
    pub fn new(
        instructions: impl Into<String>,
        origin: SessionOrigin,
        handler: Box<dyn TurnHandler>,
        router: Arc<RouterClient>,
    ) -> Self {
        Self {
            instructions: instructions.into(),
            origin,
            handler,
            router,
            greeted: AtomicBool::new(false),
        }
    }

    /// The agent's system prompt, handed to the transport's LLM pipeline.
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn origin(&self) -> SessionOrigin {
        self.origin
    }

    /// Entry hook: greets the user exactly once per session instance, even
    /// if the transport invokes it again.
    pub async fn on_enter(&self, session: &dyn ConversationSession) -> Result<(), SessionError> {
        if self.greeted.swap(true, Ordering::SeqCst) {
            tracing::info!("entry hook re-invoked, greeting already sent");
            return Ok(());
        }

        match self.origin {
            SessionOrigin::Reconnection => {
                tracing::info!("entering session after reconnection, sending welcome back")
            }
            SessionOrigin::New => tracing::info!("entering new session, sending greeting"),
        }

        tokio::time::sleep(GREETING_SETTLE_DELAY).await;

        if self.router.is_enabled() {
            let probe = match self.origin {
                SessionOrigin::Reconnection => {
                    "[SYSTEM: The user has just reconnected after briefly leaving. Welcome them \
                     back warmly. If you know their name, use it. Keep it brief - just \
                     acknowledge you're glad they're back and ask how you can help.]"
                }
                SessionOrigin::New => {
                    "[SYSTEM: This is a new session. Check if the user has a stored name and \
                     greet accordingly. If no name is stored, ask for their name. If a name is \
                     stored, greet them by name.]"
                }
            };
            let context = json!({
                "mode": "voice",
                "source": "livekit",
                "session_start": true,
                "is_reconnection": self.origin.is_reconnection(),
            });

            let response = self.router.chat(VOICE_USER_ID, probe, context).await;
            if response.success {
                tracing::info!(agent = %response.agent, "backend produced memory-aware greeting");
                return session.say(&response.response, true, true).await;
            }
            tracing::warn!(
                agent = %response.agent,
                error = response.error.as_deref().unwrap_or(""),
                "backend greeting failed, using local greeting"
            );
        }

        let instructions = match self.origin {
            SessionOrigin::Reconnection => {
                "Welcome the user back briefly. They just reconnected after a brief \
                 interruption. Ask how you can help them."
            }
            SessionOrigin::New => {
                "Greet the user warmly and let them know you're AImee, their AI tour guide \
                 assistant, ready to help with location information and travel guidance. Ask \
                 what you should call them."
            }
        };
        session.generate_reply(Some(instructions)).await
    }

    /// Turn driver: consults the handler and runs local generation only
    /// when the handler passed the turn through.
    pub async fn on_user_turn(
        &self,
        session: &dyn ConversationSession,
        text: &str,
    ) -> Result<(), SessionError> {
        tracing::info!(text = %snippet(text), "user turn completed");
        match self.handler.on_user_turn_completed(session, text).await {
            TurnDisposition::Handled => Ok(()),
            TurnDisposition::PassThrough => session.generate_reply(None).await,
        }
    }

    /// Exit hook: releases resources held by the routing client. Runs for
    /// graceful and forced session end alike.
    pub async fn on_exit(&self) {
        tracing::info!("agent exiting session");
        self.router.close().await;
    }
}

fn snippet(text: &str) -> String {
    const LIMIT: usize = 100;
    if text.len() <= LIMIT {
        return text.to_string();
    }
    let mut end = LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimee_backend::{BackendConfig, RouterClient};
    use aimee_session::DirectTurnHandler;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSession {
        says: Mutex<Vec<String>>,
        replies: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl ConversationSession for RecordingSession {
        async fn start(self: Arc<Self>) -> Result<(), SessionError> {
            Ok(())
        }

        async fn say(
            &self,
            text: &str,
            _interruptible: bool,
            _add_to_history: bool,
        ) -> Result<(), SessionError> {
            self.says.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn generate_reply(&self, instructions: Option<&str>) -> Result<(), SessionError> {
            self.replies
                .lock()
                .unwrap()
                .push(instructions.map(str::to_string));
            Ok(())
        }

        async fn close(&self) {}
    }

    struct HandledHandler;

    #[async_trait]
    impl TurnHandler for HandledHandler {
        async fn on_user_turn_completed(
            &self,
            _session: &dyn ConversationSession,
            _text: &str,
        ) -> TurnDisposition {
            TurnDisposition::Handled
        }
    }

    fn offline_router() -> Arc<RouterClient> {
        Arc::new(RouterClient::new(BackendConfig {
            enabled: false,
            url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 1,
        }))
    }

    fn agent_with(origin: SessionOrigin, handler: Box<dyn TurnHandler>) -> VoiceAgent {
        VoiceAgent::new("You are AImee.", origin, handler, offline_router())
    }

    #[tokio::test(start_paused = true)]
    async fn greeting_runs_exactly_once() {
        let session = RecordingSession::default();
        let agent = agent_with(SessionOrigin::New, Box::new(DirectTurnHandler));

        agent.on_enter(&session).await.unwrap();
        agent.on_enter(&session).await.unwrap();

        let replies = session.replies.lock().unwrap();
        assert_eq!(replies.len(), 1);
        let greeting = replies[0].as_deref().unwrap();
        assert!(greeting.contains("tour guide"));
    }

    #[tokio::test(start_paused = true)]
    async fn reconnection_greeting_wording_differs() {
        let session = RecordingSession::default();
        let agent = agent_with(SessionOrigin::Reconnection, Box::new(DirectTurnHandler));

        agent.on_enter(&session).await.unwrap();

        let replies = session.replies.lock().unwrap();
        let greeting = replies[0].as_deref().unwrap();
        assert!(greeting.contains("Welcome the user back"));
        assert!(!greeting.contains("tour guide"));
    }

    #[tokio::test]
    async fn pass_through_turn_runs_local_generation_once() {
        let session = RecordingSession::default();
        let agent = agent_with(SessionOrigin::New, Box::new(DirectTurnHandler));

        agent.on_user_turn(&session, "what's near me?").await.unwrap();

        assert_eq!(session.replies.lock().unwrap().as_slice(), [None]);
        assert!(session.says.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn handled_turn_skips_local_generation() {
        let session = RecordingSession::default();
        let agent = agent_with(SessionOrigin::New, Box::new(HandledHandler));

        agent.on_user_turn(&session, "what's near me?").await.unwrap();

        assert!(session.replies.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn exit_hook_is_safe_with_unopened_router() {
        let agent = agent_with(SessionOrigin::New, Box::new(DirectTurnHandler));
        agent.on_exit().await;
        agent.on_exit().await;
    }
}
