//! Per-room session lifecycle.
//!
//! One supervisor per room invocation. It owns the "is a session active"
//! state, creates the initial session, and creates a fresh session when a
//! participant reconnects after the transport tore the previous one down.
//! Actual session teardown is the transport's job; the supervisor only
//! tracks it.

use std::sync::{Arc, Mutex};

use aimee_types::RoomEvent;
use tokio::sync::mpsc;

use crate::error::SessionError;
use crate::registry::{RoomRegistry, SessionOrigin};
use crate::transport::{ConversationSession, SessionFactory};

/// Holder state for the room's current session.
///
/// `creating` makes the single-creation-in-flight rule explicit under a
/// multi-threaded runtime; `had_active_session` distinguishes "the initial
/// session is still starting" from "a session existed and was torn down",
/// which is what gates reconnection creation.
#[derive(Default)]
struct HolderState {
    session: Option<Arc<dyn ConversationSession>>,
    active: bool,
    had_active_session: bool,
    creating: bool,
}

pub struct SessionSupervisor {
    room_name: String,
    agent_identity: String,
    registry: Arc<RoomRegistry>,
    factory: Arc<dyn SessionFactory>,
    state: Mutex<HolderState>,
}

impl SessionSupervisor {
    pub fn new(
        room_name: impl Into<String>,
        agent_identity: impl Into<String>,
        registry: Arc<RoomRegistry>,
        factory: Arc<dyn SessionFactory>,
    ) -> Self {
        Self {
            room_name: room_name.into(),
            agent_identity: agent_identity.into(),
            registry,
            factory,
            state: Mutex::new(HolderState::default()),
        }
    }

    /// True while a session is bound and its participant has not
    /// disconnected.
    pub fn is_active(&self) -> bool {
        self.lock_state().active
    }

    /// True once any session has been created for this room invocation.
    pub fn had_active_session(&self) -> bool {
        self.lock_state().had_active_session
    }

    /// Builds and starts a session for the room.
    ///
    /// At most one creation runs at a time: a call while a session is
    /// active or another creation is in flight is suppressed and returns
    /// `Ok`. The holder flags are set only after `start` succeeds, so a
    /// failed start leaves the supervisor able to try again on the next
    /// join.
    pub async fn create_session(&self, origin: SessionOrigin) -> Result<(), SessionError> {
        if !self.begin_creation() {
            tracing::debug!(
                room = %self.room_name,
                "session creation suppressed, one already active or in flight"
            );
            return Ok(());
        }

        tracing::info!(room = %self.room_name, origin = ?origin, "creating agent session");

        let session = match self.factory.build(origin).await {
            Ok(session) => session,
            Err(e) => {
                self.end_creation(None);
                return Err(e);
            }
        };

        if let Err(e) = Arc::clone(&session).start().await {
            self.end_creation(None);
            return Err(e);
        }

        self.end_creation(Some(session));
        tracing::info!(room = %self.room_name, origin = ?origin, "agent session ready");
        Ok(())
    }

    /// Handles a remote participant joining the room.
    ///
    /// A join while a session is active (or starting) is a duplicate
    /// notification and a no-op. A join after a session was torn down
    /// spawns a reconnection session as an independent task so the event
    /// loop never blocks on session startup. A join before the initial
    /// session finished starting does nothing, since that creation will
    /// serve this participant.
    pub fn on_participant_connected(self: &Arc<Self>, identity: &str) {
        if identity == self.agent_identity {
            return;
        }

        tracing::info!(room = %self.room_name, identity, "participant connected");
        self.registry.touch_connect(&self.room_name);

        let (active, creating, had_active_session) = {
            let state = self.lock_state();
            (state.active, state.creating, state.had_active_session)
        };

        if active || creating {
            tracing::debug!(room = %self.room_name, "session already active, duplicate join ignored");
        } else if had_active_session {
            tracing::info!(
                room = %self.room_name,
                "session was closed, creating new session for reconnected participant"
            );
            let supervisor = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = supervisor.create_session(SessionOrigin::Reconnection).await {
                    tracing::error!(
                        room = %supervisor.room_name,
                        "failed to create session for reconnected participant: {}",
                        e
                    );
                }
            });
        } else {
            tracing::info!(
                room = %self.room_name,
                "no previous session existed, initial session creation will handle this participant"
            );
        }
    }

    /// Handles a remote participant leaving the room.
    ///
    /// Marks the session inactive; the transport closes it on its own. The
    /// flag only gates whether a future join creates a fresh session.
    pub fn on_participant_disconnected(&self, identity: &str) {
        if identity == self.agent_identity {
            return;
        }

        tracing::info!(room = %self.room_name, identity, "participant disconnected");
        self.registry.touch_disconnect(&self.room_name);
        self.lock_state().active = false;
    }

    /// Dispatches transport events in arrival order until the channel
    /// closes.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<RoomEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                RoomEvent::ParticipantConnected { identity } => {
                    self.on_participant_connected(&identity);
                }
                RoomEvent::ParticipantDisconnected { identity } => {
                    self.on_participant_disconnected(&identity);
                }
            }
        }
        tracing::debug!(room = %self.room_name, "room event channel closed");
    }

    /// Closes the current session, if any. Safe to call repeatedly.
    pub async fn shutdown(&self) {
        let session = {
            let mut state = self.lock_state();
            state.active = false;
            state.session.take()
        };
        if let Some(session) = session {
            session.close().await;
        }
    }

    fn begin_creation(&self) -> bool {
        let mut state = self.lock_state();
        if state.active || state.creating {
            return false;
        }
        state.creating = true;
        true
    }

    fn end_creation(&self, session: Option<Arc<dyn ConversationSession>>) {
        let mut state = self.lock_state();
        state.creating = false;
        if let Some(session) = session {
            state.session = Some(session);
            state.active = true;
            state.had_active_session = true;
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, HolderState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
