//! The routing client itself.

use std::time::Duration;

use aimee_types::{ArrivalRequest, BackendResponse, ChatRequest, GeoPoint};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::BackendConfig;

/// Truncation length for request/response text in log lines.
const LOG_SNIPPET_LEN: usize = 100;

/// HTTP client for the backend multi-agent router.
///
/// Connections are pooled through a lazily-created [`reqwest::Client`],
/// rebuilt on first use after [`RouterClient::close`]. All failure modes
/// are absorbed into [`BackendResponse`] values; the routing methods never
/// return `Err` and never panic, so a backend outage degrades to local
/// generation instead of surfacing to the transport layer.
pub struct RouterClient {
    config: BackendConfig,
    pool: Mutex<Option<reqwest::Client>>,
}

impl RouterClient {
    pub fn new(config: BackendConfig) -> Self {
        tracing::info!(
            url = %config.url,
            enabled = config.enabled,
            timeout_secs = config.timeout_secs,
            "backend router client configured"
        );
        Self {
            config,
            pool: Mutex::new(None),
        }
    }

    /// Whether routing is enabled by configuration.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Gets the pooled HTTP client, building it on first use or after a
    /// `close`.
    async fn http(&self) -> Result<reqwest::Client, reqwest::Error> {
        let mut pool = self.pool.lock().await;
        if let Some(client) = pool.as_ref() {
            return Ok(client.clone());
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()?;
        *pool = Some(client.clone());
        Ok(client)
    }

    /// Drops the pooled connection. Safe to call repeatedly and safe if no
    /// request was ever made; a later request transparently rebuilds the
    /// client.
    pub async fn close(&self) {
        self.pool.lock().await.take();
    }

    /// Sends one user utterance to the backend router.
    pub async fn chat(&self, user_id: &str, input: &str, context: Value) -> BackendResponse {
        if !self.config.enabled {
            return BackendResponse::disabled();
        }

        tracing::info!(
            user_id,
            input = %snippet(input),
            "routing utterance to backend"
        );

        let request = ChatRequest {
            user_id: user_id.to_string(),
            input: input.to_string(),
            context,
        };
        self.post_routed("/aimee-chat", &request).await
    }

    /// Sends a GPS arrival event to the backend for a location narrative.
    pub async fn arrival(
        &self,
        user_id: &str,
        marker_id: &str,
        marker_name: &str,
        location: GeoPoint,
        mode: &str,
    ) -> BackendResponse {
        if !self.config.enabled {
            return BackendResponse::disabled();
        }

        tracing::info!(
            user_id,
            marker_id,
            marker_name,
            lat = location.lat,
            lng = location.lng,
            mode,
            "sending arrival to backend"
        );

        let request = ArrivalRequest {
            user_id: user_id.to_string(),
            marker_id: marker_id.to_string(),
            marker_name: marker_name.to_string(),
            location,
            mode: mode.to_string(),
        };
        self.post_routed("/aimee-arrival", &request).await
    }

    /// Probes `GET /health`; true iff the backend answers 200 with
    /// `{"status": "ok"}`.
    pub async fn health_check(&self) -> bool {
        let client = match self.http().await {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("health check failed to build client: {}", e);
                return false;
            }
        };

        let url = format!("{}/health", self.config.url);
        match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => match response.json::<Value>().await
            {
                Ok(body) => body.get("status").and_then(Value::as_str) == Some("ok"),
                Err(e) => {
                    tracing::warn!("health check returned unreadable body: {}", e);
                    false
                }
            },
            Ok(response) => {
                tracing::warn!(status = response.status().as_u16(), "health check failed");
                false
            }
            Err(e) => {
                tracing::warn!("health check failed: {}", e);
                false
            }
        }
    }

    /// POSTs a routed operation and classifies the outcome.
    async fn post_routed<T: Serialize>(&self, path: &str, payload: &T) -> BackendResponse {
        let client = match self.http().await {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(path, "failed to build HTTP client: {}", e);
                return BackendResponse::failed("unexpected_error", format!("Unexpected error: {}", e));
            }
        };

        let url = format!("{}{}", self.config.url, path);
        let response = match client.post(&url).json(payload).send().await {
            Ok(response) => response,
            Err(e) => return self.classify_transport_error(path, e),
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let error = format!("HTTP {}: {}", status.as_u16(), body);
            tracing::error!(
                path,
                status = status.as_u16(),
                body = %snippet(&body),
                "backend returned HTTP error"
            );
            return BackendResponse::failed("error", error);
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => return self.classify_transport_error(path, e),
        };

        if body.get("success").and_then(Value::as_bool).unwrap_or(false) {
            let agent = body
                .get("agent")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            let text = body
                .get("response")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let metadata = body
                .get("metadata")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            tracing::info!(path, agent = %agent, response = %snippet(&text), "backend success");
            BackendResponse::routed(agent, text, metadata)
        } else {
            let error = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Unknown backend error")
                .to_string();
            tracing::error!(path, error = %error, "backend reported failure");
            BackendResponse::failed("error", error)
        }
    }

    /// Maps a transport-level fault to its error-class tag.
    fn classify_transport_error(&self, path: &str, err: reqwest::Error) -> BackendResponse {
        if err.is_timeout() {
            let error = format!("Request timeout after {}s", self.config.timeout_secs);
            tracing::error!(path, "{}", error);
            BackendResponse::failed("timeout", error)
        } else if err.is_connect() || err.is_request() {
            let error = format!("Network error: {}", err);
            tracing::error!(path, "{}", error);
            BackendResponse::failed("network_error", error)
        } else {
            let error = format!("Unexpected error: {}", err);
            tracing::error!(path, "{}", error);
            BackendResponse::failed("unexpected_error", error)
        }
    }
}

/// Truncates text for logging, the way the rest of the pipeline logs
/// utterances: first 100 chars plus an ellipsis.
fn snippet(text: &str) -> String {
    if text.len() <= LOG_SNIPPET_LEN {
        return text.to_string();
    }
    let mut end = LOG_SNIPPET_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_client_short_circuits_without_network() {
        // URL points nowhere; with routing disabled no request is made.
        let client = RouterClient::new(BackendConfig {
            enabled: false,
            url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 1,
        });

        let chat = client.chat("voice-user", "hello", serde_json::json!({})).await;
        assert!(!chat.success);
        assert_eq!(chat.agent, "direct");
        assert_eq!(chat.error.as_deref(), Some("Backend router is disabled"));

        let arrival = client
            .arrival(
                "voice-user",
                "m-1",
                "Mill Ruins",
                GeoPoint { lat: 44.98, lng: -93.25 },
                "walk",
            )
            .await;
        assert_eq!(arrival.agent, "direct");
    }

    #[tokio::test]
    async fn close_is_idempotent_and_safe_before_any_request() {
        let client = RouterClient::new(BackendConfig::default());
        client.close().await;
        client.close().await;
    }

    #[test]
    fn snippet_truncates_and_respects_char_boundaries() {
        let short = "hello";
        assert_eq!(snippet(short), "hello");

        let long = "x".repeat(150);
        let truncated = snippet(&long);
        assert_eq!(truncated.len(), LOG_SNIPPET_LEN + 3);
        assert!(truncated.ends_with("..."));

        // 100 bytes falls inside a multi-byte char; must not panic.
        let multibyte = "é".repeat(80);
        let _ = snippet(&multibyte);
    }
}
