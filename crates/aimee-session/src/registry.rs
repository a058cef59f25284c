//! Room activity tracking and reconnection classification.
//!
//! One record per room name for the life of the process. A join within
//! [`RECONNECT_WINDOW`] of the room's last recorded activity is treated as
//! the same logical visitor resuming; anything later, or a room never seen
//! before, is a new session.
//!
//! The heuristic has no identity correlation beyond the room name: rooms
//! are assumed single-occupant, so a different user joining the same room
//! inside the window also classifies as a reconnection.
//!
//! Records are never evicted: the map grows with the set of room names the
//! process has served. Bounded eviction (LRU by `last_seen_at`) is a known
//! follow-up for long-lived deployments.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A join this long (or longer) after the room's last recorded activity is
/// a new session; strictly less is a reconnection.
pub const RECONNECT_WINDOW: Duration = Duration::from_secs(300);

/// How a joining participant relates to the room's recent history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// First visit, or the previous visit's window has expired.
    New,
    /// The room saw activity within the reconnection window.
    Reconnection,
}

impl SessionOrigin {
    pub fn is_reconnection(self) -> bool {
        matches!(self, Self::Reconnection)
    }
}

/// Activity record for one room.
///
/// Invariant: `last_seen_at >= started_at`; both are refreshed on every
/// connect and disconnect event for the room.
#[derive(Debug, Clone)]
pub struct RoomSessionRecord {
    pub started_at: Instant,
    pub last_seen_at: Instant,
    pub participant_connected: bool,
}

/// Process-wide map of room activity records.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, RoomSessionRecord>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies a join against the room's last recorded activity, then
    /// resets the record for the session now beginning
    /// (`started_at = last_seen_at = now`, participant not yet connected).
    ///
    /// Lookup, classification, and overwrite happen under a single lock
    /// acquisition so two concurrent joins for one room cannot both
    /// classify as new.
    pub fn classify_join(&self, room: &str) -> SessionOrigin {
        self.classify_join_at(room, Instant::now())
    }

    fn classify_join_at(&self, room: &str, now: Instant) -> SessionOrigin {
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());

        let origin = match rooms.get(room) {
            None => {
                tracing::info!(room, "no previous activity for room, treating as new session");
                SessionOrigin::New
            }
            Some(record) => {
                let elapsed = now.duration_since(record.last_seen_at);
                if elapsed < RECONNECT_WINDOW {
                    tracing::info!(
                        room,
                        elapsed_secs = elapsed.as_secs(),
                        "participant last seen inside the reconnection window"
                    );
                    SessionOrigin::Reconnection
                } else {
                    tracing::info!(
                        room,
                        elapsed_secs = elapsed.as_secs(),
                        "previous activity expired, treating as new session"
                    );
                    SessionOrigin::New
                }
            }
        };

        rooms.insert(
            room.to_string(),
            RoomSessionRecord {
                started_at: now,
                last_seen_at: now,
                participant_connected: false,
            },
        );

        origin
    }

    /// Records a participant connect for the room.
    pub fn touch_connect(&self, room: &str) {
        self.touch_at(room, Instant::now(), true);
    }

    /// Records a participant disconnect for the room.
    pub fn touch_disconnect(&self, room: &str) {
        self.touch_at(room, Instant::now(), false);
    }

    fn touch_at(&self, room: &str, now: Instant, connected: bool) {
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        let record = rooms
            .entry(room.to_string())
            .or_insert_with(|| RoomSessionRecord {
                started_at: now,
                last_seen_at: now,
                participant_connected: connected,
            });
        record.last_seen_at = now;
        record.participant_connected = connected;
    }

    /// Snapshot of a room's record, if any.
    pub fn get(&self, room: &str) -> Option<RoomSessionRecord> {
        self.rooms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(room)
            .cloned()
    }

    /// Number of rooms tracked. Never shrinks.
    pub fn len(&self) -> usize {
        self.rooms.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
