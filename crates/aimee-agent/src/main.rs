//! AImee agent worker binary.
//!
//! Loads configuration, initializes structured logging, and serves the
//! configured room until SIGINT/SIGTERM, at which point the active session
//! is closed gracefully.

use std::sync::Arc;

use aimee_agent::config;
use aimee_agent::worker::Worker;
use aimee_backend::RouterClient;
use aimee_session::RoomRegistry;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("AIMEE_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration; missing connectivity credentials are fatal.
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration — the agent cannot start without valid connectivity settings");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );
    config::log_startup(&config);

    let registry = Arc::new(RoomRegistry::new());
    let router = Arc::new(RouterClient::new(config.backend.clone()));
    let worker = Worker::new(Arc::new(config), registry, router);

    // The sender side is handed to the transport bridge, which forwards
    // participant events from the room; holding it here keeps the channel
    // open until shutdown.
    let (event_tx, event_rx) = mpsc::channel(64);

    let worker_task = tokio::spawn(async move { worker.run(event_rx).await });

    shutdown_signal().await;
    tracing::info!("shutdown signal received, closing session");
    drop(event_tx);

    match worker_task.await {
        Ok(Ok(())) => tracing::info!("agent worker shut down"),
        Ok(Err(e)) => tracing::error!("agent worker failed: {}", e),
        Err(e) => tracing::error!("agent worker task panicked: {}", e),
    }
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
