//! LiveKit transport integration.
//!
//! Server-side room management goes through the LiveKit Room Service API:
//! minting join tokens for the agent identity, creating the room, and
//! inspecting participants. The media session itself (audio tracks, VAD,
//! STT, TTS) is owned by the agents SDK; [`LiveKitSession`] carries the
//! protocol surface around it: the agent callbacks, the recognized-turn
//! feed, and the speech operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aimee_session::{ConversationSession, SessionError};
use async_trait::async_trait;
use livekit_api::access_token::{AccessToken, VideoGrants};
use livekit_api::services::room::{CreateRoomOptions, RoomClient};
use livekit_protocol::Room;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::agent::VoiceAgent;
use crate::config::LiveKitConfig;

/// JWT TTL for agent join tokens.
const TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Capacity of the recognized-utterance queue feeding the turn pipeline.
const UTTERANCE_QUEUE_CAPACITY: usize = 32;

/// Server-side LiveKit room management.
#[derive(Debug)]
pub struct RoomService {
    config: LiveKitConfig,
    room_client: RoomClient,
}

impl RoomService {
    pub fn new(config: &LiveKitConfig) -> Self {
        let room_client =
            RoomClient::with_api_key(&config.url, &config.api_key, &config.api_secret);
        Self {
            config: config.clone(),
            room_client,
        }
    }

    pub async fn create_room(&self, name: &str) -> Result<Room, SessionError> {
        let options = CreateRoomOptions::default();
        self.room_client
            .create_room(name, options)
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }

    /// Mints a join token granting the agent publish/subscribe access to
    /// the room.
    pub fn agent_join_token(
        &self,
        room_name: &str,
        identity: &str,
    ) -> Result<String, SessionError> {
        let token = AccessToken::with_api_key(&self.config.api_key, &self.config.api_secret)
            .with_identity(identity)
            .with_name(identity)
            .with_grants(VideoGrants {
                room_join: true,
                room: room_name.to_string(),
                can_publish: true,
                can_subscribe: true,
                can_publish_data: true,
                ..Default::default()
            })
            .with_ttl(TOKEN_TTL);

        token
            .to_jwt()
            .map_err(|e| SessionError::Transport(e.to_string()))
    }

    /// Returns the number of participants currently in a room.
    /// Returns 0 if the room does not exist.
    pub async fn participant_count(&self, room_name: &str) -> u32 {
        match self.room_client.list_participants(room_name).await {
            Ok(participants) => participants.len() as u32,
            Err(_) => 0, // Room doesn't exist yet
        }
    }
}

/// A conversational session bound to a LiveKit room.
///
/// In a deployment with the full agents SDK, this wraps the SDK's session
/// object and its VAD + STT + LLM + TTS pipeline; the SDK delivers
/// recognized user turns and renders outgoing speech. This adapter owns
/// everything on this side of that boundary: the agent callbacks, the
/// one-shot start/close transitions, and the recognized-turn pump.
pub struct LiveKitSession {
    id: Uuid,
    room_name: String,
    room_url: String,
    token: String,
    llm_model: String,
    agent: Arc<VoiceAgent>,
    connected: AtomicBool,
    closed: AtomicBool,
    utterance_tx: Mutex<Option<mpsc::Sender<String>>>,
    utterance_rx: Mutex<Option<mpsc::Receiver<String>>>,
}

impl LiveKitSession {
    pub fn new(
        room_url: impl Into<String>,
        token: impl Into<String>,
        room_name: impl Into<String>,
        llm_model: impl Into<String>,
        agent: Arc<VoiceAgent>,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(UTTERANCE_QUEUE_CAPACITY);
        Arc::new(Self {
            id: Uuid::new_v4(),
            room_name: room_name.into(),
            room_url: room_url.into(),
            token: token.into(),
            llm_model: llm_model.into(),
            agent,
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            utterance_tx: Mutex::new(Some(tx)),
            utterance_rx: Mutex::new(Some(rx)),
        })
    }

    pub fn agent(&self) -> &Arc<VoiceAgent> {
        &self.agent
    }

    /// Feeds one recognized user utterance into the turn pipeline. Wired
    /// to the SDK's speech recognition in production; test drivers call it
    /// directly.
    pub async fn push_user_turn(&self, text: impl Into<String>) {
        let sender = self
            .utterance_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match sender {
            Some(sender) => {
                if sender.send(text.into()).await.is_err() {
                    tracing::debug!(room = %self.room_name, "utterance dropped, session closed");
                }
            }
            None => {
                tracing::debug!(room = %self.room_name, "utterance dropped, session closed");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConversationSession for LiveKitSession {
    async fn start(self: Arc<Self>) -> Result<(), SessionError> {
        if self.connected.swap(true, Ordering::SeqCst) {
            return Err(SessionError::Start("session already started".to_string()));
        }

        tracing::info!(
            session_id = %self.id,
            room = %self.room_name,
            url = %self.room_url,
            token_len = self.token.len(),
            model = %self.llm_model,
            "starting conversational session"
        );

        let rx = self
            .utterance_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let mut rx = rx.ok_or_else(|| SessionError::Start("turn feed already taken".to_string()))?;

        // Recognized utterances flow to the agent's turn driver for as
        // long as the session lives.
        let pump = Arc::clone(&self);
        tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                let session: &dyn ConversationSession = pump.as_ref();
                if let Err(e) = pump.agent.on_user_turn(session, &text).await {
                    tracing::warn!(room = %pump.room_name, "turn handling failed: {}", e);
                }
            }
            tracing::debug!(room = %pump.room_name, "turn feed closed");
        });

        // The entry hook (greeting) runs concurrently: it sleeps for the
        // audio-track settle delay and must not hold up session startup.
        let entry = Arc::clone(&self);
        tokio::spawn(async move {
            let session: &dyn ConversationSession = entry.as_ref();
            if let Err(e) = entry.agent.on_enter(session).await {
                tracing::warn!(room = %entry.room_name, "entry hook failed: {}", e);
            }
        });

        Ok(())
    }

    async fn say(
        &self,
        text: &str,
        interruptible: bool,
        add_to_history: bool,
    ) -> Result<(), SessionError> {
        if !self.is_running() {
            return Err(SessionError::Transport("session is not running".to_string()));
        }
        tracing::info!(
            room = %self.room_name,
            interruptible,
            add_to_history,
            chars = text.len(),
            "speaking rendered reply"
        );
        // Audio rendering and publishing are the SDK's side of the
        // boundary.
        Ok(())
    }

    async fn generate_reply(&self, instructions: Option<&str>) -> Result<(), SessionError> {
        if !self.is_running() {
            return Err(SessionError::Transport("session is not running".to_string()));
        }
        tracing::info!(
            room = %self.room_name,
            model = %self.llm_model,
            steered = instructions.is_some(),
            "requesting local model reply"
        );
        Ok(())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(session_id = %self.id, room = %self.room_name, "closing conversational session");

        // Dropping the sender ends the turn pump.
        self.utterance_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        self.agent.on_exit().await;
    }
}
