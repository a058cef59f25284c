//! End-to-end worker tests against an unreachable LiveKit deployment.
//!
//! Join tokens are minted offline, so the full connect → disconnect →
//! reconnect flow runs without a live server; only room-service calls
//! degrade (and are logged) when the URL points nowhere.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use aimee_agent::config::AgentConfig;
use aimee_agent::prompts::SYSTEM_PROMPT_FILE;
use aimee_agent::worker::{Worker, WorkerError};
use aimee_backend::RouterClient;
use aimee_session::RoomRegistry;
use aimee_types::RoomEvent;
use tokio::sync::mpsc;

fn test_config(prompts_dir: &Path) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.livekit.url = "http://127.0.0.1:1".to_string();
    config.livekit.api_key = "devkey".to_string();
    config.livekit.api_secret = "secret-for-join-token-signing".to_string();
    config.openai.api_key = "sk-test".to_string();
    config.prompts.dir = prompts_dir.to_string_lossy().into_owned();
    config
}

fn connected(identity: &str) -> RoomEvent {
    RoomEvent::ParticipantConnected {
        identity: identity.to_string(),
    }
}

fn disconnected(identity: &str) -> RoomEvent {
    RoomEvent::ParticipantDisconnected {
        identity: identity.to_string(),
    }
}

#[tokio::test]
async fn worker_serves_a_connect_disconnect_reconnect_flow() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(SYSTEM_PROMPT_FILE),
        "You are AImee, a tour guide.",
    )
    .unwrap();

    let config = Arc::new(test_config(dir.path()));
    let registry = Arc::new(RoomRegistry::new());
    let router = Arc::new(RouterClient::new(config.backend.clone()));
    let worker = Worker::new(Arc::clone(&config), Arc::clone(&registry), router);

    let (tx, rx) = mpsc::channel(8);
    let handle = tokio::spawn(async move { worker.run(rx).await });

    // Let the initial session come up, then run one reconnect cycle.
    tokio::time::sleep(Duration::from_millis(300)).await;
    tx.send(connected("mobile-user")).await.unwrap();
    tx.send(disconnected("mobile-user")).await.unwrap();
    tx.send(connected("mobile-user")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    drop(tx);

    handle.await.unwrap().unwrap();

    let record = registry.get("aimee-phase1").expect("room was classified");
    assert!(record.participant_connected);
    assert!(record.last_seen_at >= record.started_at);
}

#[tokio::test]
async fn worker_refuses_to_start_without_the_system_prompt() {
    let dir = tempfile::tempdir().unwrap();

    let config = Arc::new(test_config(dir.path()));
    let registry = Arc::new(RoomRegistry::new());
    let router = Arc::new(RouterClient::new(config.backend.clone()));
    let worker = Worker::new(config, registry, router);

    let (tx, rx) = mpsc::channel(8);
    drop(tx);

    let result = worker.run(rx).await;
    assert!(matches!(result, Err(WorkerError::Prompt(_))));
}
