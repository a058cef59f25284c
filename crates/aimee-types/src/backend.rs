//! Wire types for the backend multi-agent router contract.
//!
//! The backend speaks JSON with camelCase keys; request payloads carry the
//! serde renames so callers work with ordinary Rust field names.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response from the backend multi-agent router.
///
/// On success `agent` names the backend sub-agent that produced the reply.
/// On failure it carries an error-class tag instead: `"direct"` (routing
/// disabled by configuration), `"error"` (backend-reported failure or a
/// non-200 status), `"timeout"`, `"network_error"`, or `"unexpected_error"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendResponse {
    pub success: bool,
    pub agent: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackendResponse {
    /// A successful reply from a backend sub-agent; `metadata` is passed
    /// through unchanged.
    pub fn routed(
        agent: impl Into<String>,
        response: impl Into<String>,
        metadata: Map<String, Value>,
    ) -> Self {
        Self {
            success: true,
            agent: agent.into(),
            response: response.into(),
            metadata,
            error: None,
        }
    }

    /// A failure carrying an error-class tag; `response` is always empty.
    pub fn failed(agent: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            agent: agent.into(),
            response: String::new(),
            metadata: Map::new(),
            error: Some(error.into()),
        }
    }

    /// The immediate result when routing is disabled by configuration.
    /// No network call is made.
    pub fn disabled() -> Self {
        Self::failed("direct", "Backend router is disabled")
    }
}

/// Body for `POST /aimee-chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub user_id: String,
    pub input: String,
    pub context: Value,
}

/// Geographic coordinate pair for arrival events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Body for `POST /aimee-arrival`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalRequest {
    pub user_id: String,
    pub marker_id: String,
    pub marker_name: String,
    pub location: GeoPoint,
    pub mode: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_request_uses_camel_case_keys() {
        let request = ChatRequest {
            user_id: "voice-user".to_string(),
            input: "hello".to_string(),
            context: json!({"mode": "voice"}),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["userId"], "voice-user");
        assert_eq!(value["input"], "hello");
        assert_eq!(value["context"]["mode"], "voice");
    }

    #[test]
    fn arrival_request_uses_camel_case_keys() {
        let request = ArrivalRequest {
            user_id: "voice-user".to_string(),
            marker_id: "m-17".to_string(),
            marker_name: "Old Mill".to_string(),
            location: GeoPoint { lat: 44.98, lng: -93.27 },
            mode: "drive".to_string(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["userId"], "voice-user");
        assert_eq!(value["markerId"], "m-17");
        assert_eq!(value["markerName"], "Old Mill");
        assert_eq!(value["location"]["lat"], 44.98);
        assert_eq!(value["location"]["lng"], -93.27);
        assert_eq!(value["mode"], "drive");
    }

    #[test]
    fn failure_carries_error_and_empty_response() {
        let response = BackendResponse::failed("timeout", "Request timeout after 10s");
        assert!(!response.success);
        assert_eq!(response.agent, "timeout");
        assert!(response.response.is_empty());
        assert_eq!(response.error.as_deref(), Some("Request timeout after 10s"));
    }

    #[test]
    fn disabled_is_tagged_direct() {
        let response = BackendResponse::disabled();
        assert!(!response.success);
        assert_eq!(response.agent, "direct");
        assert_eq!(response.error.as_deref(), Some("Backend router is disabled"));
    }

    #[test]
    fn success_body_round_trips() {
        let body = json!({
            "success": true,
            "agent": "tour-guide",
            "response": "Welcome back!",
            "metadata": {"memory_hits": 2}
        });

        let parsed: BackendResponse = serde_json::from_value(body).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.agent, "tour-guide");
        assert_eq!(parsed.response, "Welcome back!");
        assert_eq!(parsed.metadata["memory_hits"], 2);
        assert!(parsed.error.is_none());
    }
}
