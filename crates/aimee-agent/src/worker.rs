//! Per-room worker entrypoint: wires the registry, supervisor, and
//! transport together for one room assignment.

use std::sync::Arc;

use aimee_backend::RouterClient;
use aimee_session::{
    BackendRoutedTurnHandler, ConversationSession, DirectTurnHandler, RoomRegistry, SessionError,
    SessionFactory, SessionOrigin, SessionSupervisor, TurnHandler,
};
use aimee_types::RoomEvent;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::agent::{VoiceAgent, VOICE_USER_ID};
use crate::config::AgentConfig;
use crate::livekit::{LiveKitSession, RoomService};
use crate::prompts::{PromptError, PromptLoader};

/// Errors that end a room assignment.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("prompt loading failed: {0}")]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Builds a transport-bound session and agent for every creation request:
/// the initial session and each reconnection.
struct AimeeSessionFactory {
    config: Arc<AgentConfig>,
    router: Arc<RouterClient>,
    rooms: Arc<RoomService>,
    system_prompt: String,
}

#[async_trait]
impl SessionFactory for AimeeSessionFactory {
    async fn build(
        &self,
        origin: SessionOrigin,
    ) -> Result<Arc<dyn ConversationSession>, SessionError> {
        // The turn-handling variant is fixed at construction time.
        let handler: Box<dyn TurnHandler> = if self.config.backend.enabled {
            Box::new(BackendRoutedTurnHandler::new(
                Arc::clone(&self.router),
                VOICE_USER_ID,
            ))
        } else {
            Box::new(DirectTurnHandler)
        };

        let agent = Arc::new(VoiceAgent::new(
            self.system_prompt.clone(),
            origin,
            handler,
            Arc::clone(&self.router),
        ));

        let room_name = &self.config.agent.room_name;
        let token = self
            .rooms
            .agent_join_token(room_name, &self.config.agent.identity)?;

        let session = LiveKitSession::new(
            &self.config.livekit.url,
            token,
            room_name.clone(),
            self.config.model.llm.clone(),
            agent,
        );
        Ok(session)
    }
}

/// One worker process serves one room at a time.
pub struct Worker {
    config: Arc<AgentConfig>,
    registry: Arc<RoomRegistry>,
    router: Arc<RouterClient>,
}

impl Worker {
    pub fn new(
        config: Arc<AgentConfig>,
        registry: Arc<RoomRegistry>,
        router: Arc<RouterClient>,
    ) -> Self {
        Self {
            config,
            registry,
            router,
        }
    }

    /// Serves the configured room until the event channel closes, then
    /// tears the session down.
    pub async fn run(&self, events: mpsc::Receiver<RoomEvent>) -> Result<(), WorkerError> {
        let room_name = self.config.agent.room_name.clone();
        tracing::info!(room = %room_name, "agent starting session in room");

        if self.config.backend.enabled {
            // Informational only; routing stays fail-open either way.
            let healthy = self.router.health_check().await;
            tracing::info!(healthy, "backend health probe");
        }

        let loader = PromptLoader::new(&self.config.prompts.dir);
        let system_prompt = loader.system_prompt()?;

        let rooms = Arc::new(RoomService::new(&self.config.livekit));
        if let Err(e) = rooms.create_room(&room_name).await {
            tracing::warn!(
                room = %room_name,
                "room creation failed, transport may create it on join: {}",
                e
            );
        }
        let participants = rooms.participant_count(&room_name).await;
        tracing::debug!(room = %room_name, participants, "room state at startup");

        let origin = self.registry.classify_join(&room_name);

        let factory = Arc::new(AimeeSessionFactory {
            config: Arc::clone(&self.config),
            router: Arc::clone(&self.router),
            rooms,
            system_prompt,
        });
        let supervisor = Arc::new(SessionSupervisor::new(
            room_name.clone(),
            self.config.agent.identity.clone(),
            Arc::clone(&self.registry),
            factory,
        ));

        // Event handlers are live before the initial session finishes
        // starting; the supervisor's holder flags cover the join-races
        // that allows.
        let event_loop = tokio::spawn(Arc::clone(&supervisor).run(events));

        tracing::info!(room = %room_name, "creating initial agent session");
        supervisor.create_session(origin).await?;

        let router_mode = if self.config.backend.enabled {
            "backend router"
        } else {
            "direct"
        };
        tracing::info!(room = %room_name, router_mode, "agent is ready");

        event_loop.await.ok();
        supervisor.shutdown().await;
        tracing::info!(room = %room_name, "room assignment finished");
        Ok(())
    }
}
