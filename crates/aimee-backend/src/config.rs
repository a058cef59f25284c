//! Backend router configuration.

use serde::{Deserialize, Serialize};

fn default_url() -> String {
    "http://backend:3000".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Configuration for the backend routing client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Whether utterances are routed through the backend at all. When
    /// false, every routing call short-circuits to a `"direct"` failure
    /// and the local model handles the turn.
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of the backend router.
    #[serde(default = "default_url")]
    pub url: String,

    /// Total request timeout in seconds, covering connect through body.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
