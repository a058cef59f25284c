//! Integration tests for backend response classification.
//!
//! Each test stands up a small axum server playing the backend router and
//! verifies the client maps the outcome to the right error-class tag.

use std::net::SocketAddr;
use std::time::Duration;

use aimee_backend::{BackendConfig, RouterClient};
use aimee_types::GeoPoint;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Binds the router on an ephemeral port and serves it in the background.
async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind ephemeral port");
    let addr = listener.local_addr().expect("listener has a local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server failed");
    });
    addr
}

fn client_for(addr: SocketAddr, timeout_secs: u64) -> RouterClient {
    RouterClient::new(BackendConfig {
        enabled: true,
        url: format!("http://{}", addr),
        timeout_secs,
    })
}

#[tokio::test]
async fn success_body_is_passed_through() {
    let app = Router::new().route(
        "/aimee-chat",
        post(|| async {
            Json(json!({
                "success": true,
                "agent": "tour-guide",
                "response": "The mill was built in 1874.",
                "metadata": {"memory_hits": 1}
            }))
        }),
    );
    let addr = serve(app).await;

    let client = client_for(addr, 5);
    let response = client
        .chat("voice-user", "tell me about the mill", json!({"mode": "voice"}))
        .await;

    assert!(response.success);
    assert_eq!(response.agent, "tour-guide");
    assert_eq!(response.response, "The mill was built in 1874.");
    assert_eq!(response.metadata["memory_hits"], 1);
    assert!(response.error.is_none());
}

#[tokio::test]
async fn backend_reported_failure_is_tagged_error() {
    let app = Router::new().route(
        "/aimee-chat",
        post(|| async { Json(json!({"success": false, "error": "no such user"})) }),
    );
    let addr = serve(app).await;

    let client = client_for(addr, 5);
    let response = client.chat("voice-user", "hello", json!({})).await;

    assert!(!response.success);
    assert_eq!(response.agent, "error");
    assert_eq!(response.error.as_deref(), Some("no such user"));
    assert!(response.response.is_empty());
}

#[tokio::test]
async fn http_500_carries_status_and_body() {
    let app = Router::new().route(
        "/aimee-chat",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"error":"db down"}"#.to_string(),
            )
        }),
    );
    let addr = serve(app).await;

    let client = client_for(addr, 5);
    let response = client.chat("voice-user", "hello", json!({})).await;

    assert!(!response.success);
    assert_eq!(response.agent, "error");
    assert_eq!(
        response.error.as_deref(),
        Some(r#"HTTP 500: {"error":"db down"}"#)
    );
}

#[tokio::test]
async fn slow_backend_is_tagged_timeout() {
    let app = Router::new().route(
        "/aimee-chat",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"success": true, "agent": "slow", "response": "late"}))
        }),
    );
    let addr = serve(app).await;

    let client = client_for(addr, 1);
    let response = client.chat("voice-user", "hello", json!({})).await;

    assert!(!response.success);
    assert_eq!(response.agent, "timeout");
    assert_eq!(response.error.as_deref(), Some("Request timeout after 1s"));
}

#[tokio::test]
async fn unreachable_backend_is_tagged_network_error() {
    // Bind a listener to reserve a port, then drop it so connections are
    // refused.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(addr, 2);
    let response = client.chat("voice-user", "hello", json!({})).await;

    assert!(!response.success);
    assert_eq!(response.agent, "network_error");
}

#[tokio::test]
async fn malformed_success_body_is_tagged_unexpected() {
    let app = Router::new().route("/aimee-chat", post(|| async { "not json at all" }));
    let addr = serve(app).await;

    let client = client_for(addr, 5);
    let response = client.chat("voice-user", "hello", json!({})).await;

    assert!(!response.success);
    assert_eq!(response.agent, "unexpected_error");
}

#[tokio::test]
async fn arrival_sends_camel_case_payload_and_classifies_uniformly() {
    let app = Router::new().route(
        "/aimee-arrival",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["userId"], "voice-user");
            assert_eq!(body["markerId"], "m-17");
            assert_eq!(body["markerName"], "Old Mill");
            assert_eq!(body["location"]["lat"], 44.98);
            assert_eq!(body["mode"], "drive");
            Json(json!({
                "success": true,
                "agent": "narrator",
                "response": "You have arrived at the Old Mill.",
                "metadata": {}
            }))
        }),
    );
    let addr = serve(app).await;

    let client = client_for(addr, 5);
    let response = client
        .arrival(
            "voice-user",
            "m-17",
            "Old Mill",
            GeoPoint { lat: 44.98, lng: -93.27 },
            "drive",
        )
        .await;

    assert!(response.success);
    assert_eq!(response.agent, "narrator");
}

#[tokio::test]
async fn client_is_rebuilt_after_close() {
    let app = Router::new().route(
        "/aimee-chat",
        post(|| async { Json(json!({"success": true, "agent": "a", "response": "ok"})) }),
    );
    let addr = serve(app).await;

    let client = client_for(addr, 5);
    assert!(client.chat("voice-user", "one", json!({})).await.success);

    client.close().await;
    client.close().await;

    // The pooled client was dropped; the next call builds a fresh one.
    assert!(client.chat("voice-user", "two", json!({})).await.success);
}

#[tokio::test]
async fn health_check_requires_ok_status_body() {
    let healthy = Router::new().route("/health", get(|| async { Json(json!({"status": "ok"})) }));
    let addr = serve(healthy).await;
    assert!(client_for(addr, 2).health_check().await);

    let degraded =
        Router::new().route("/health", get(|| async { Json(json!({"status": "degraded"})) }));
    let addr = serve(degraded).await;
    assert!(!client_for(addr, 2).health_check().await);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let unreachable = listener.local_addr().unwrap();
    drop(listener);
    assert!(!client_for(unreachable, 1).health_check().await);
}
