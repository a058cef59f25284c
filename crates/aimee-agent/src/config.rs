//! Worker configuration loading from file and environment variables.

use aimee_backend::BackendConfig;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentConfig {
    /// LiveKit connectivity credentials.
    #[serde(default)]
    pub livekit: LiveKitConfig,

    /// OpenAI connectivity.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Room assignment and agent identity.
    #[serde(default)]
    pub agent: RoomConfig,

    /// Model selection.
    #[serde(default)]
    pub model: ModelConfig,

    /// Backend router settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Prompt file settings.
    #[serde(default)]
    pub prompts: PromptConfig,
}

/// LiveKit server connection settings. All three are required at startup.
#[derive(Clone, Default, Deserialize)]
pub struct LiveKitConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
}

impl fmt::Debug for LiveKitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveKitConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// OpenAI credentials; the key is required at startup.
#[derive(Clone, Default, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Which room to serve and under which participant identity.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomConfig {
    #[serde(default = "default_room_name")]
    pub room_name: String,

    #[serde(default = "default_identity")]
    pub identity: String,
}

/// Model selection. Only the LLM model is active today; the TTS and
/// realtime entries are reserved for pipeline upgrades and are logged at
/// startup so operators can see what a deployment would switch to.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_llm_model")]
    pub llm: String,

    #[serde(default = "default_tts_model")]
    pub tts: String,

    #[serde(default = "default_realtime_model")]
    pub realtime: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "aimee_agent=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Where the externalized prompt files live.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_prompts_dir")]
    pub dir: String,
}

fn default_room_name() -> String {
    "aimee-phase1".to_string()
}

fn default_identity() -> String {
    "aimee-agent".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_tts_model() -> String {
    "gpt-4o-tts".to_string()
}

fn default_realtime_model() -> String {
    "gpt-4o-realtime-preview-2024-10-01".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_prompts_dir() -> String {
    "config/prompts".to_string()
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            room_name: default_room_name(),
            identity: default_identity(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            llm: default_llm_model(),
            tts: default_tts_model(),
            realtime: default_realtime_model(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            dir: default_prompts_dir(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// One or more required connectivity settings are absent.
    #[error("missing required configuration: {0}")]
    MissingRequired(String),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `LIVEKIT_URL`, `LIVEKIT_API_KEY`, `LIVEKIT_API_SECRET`
/// - `OPENAI_API_KEY`, `OPENAI_MODEL`, `OPENAI_TTS_MODEL`,
///   `OPENAI_REALTIME_MODEL`
/// - `ROOM_NAME`, `PARTICIPANT_IDENTITY`
/// - `USE_BACKEND_ROUTER`, `BACKEND_URL`, `BACKEND_TIMEOUT`
/// - `AIMEE_LOG_LEVEL`, `AIMEE_LOG_JSON`, `AIMEE_PROMPTS_DIR`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed,
/// or if any required connectivity credential is still empty after
/// overrides. Missing credentials are fatal: the worker must not start
/// without them.
pub fn load_config(path: Option<&str>) -> Result<AgentConfig, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                AgentConfig::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => AgentConfig::default(),
    };

    apply_env_overrides(&mut config);
    validate_required(&config)?;

    Ok(config)
}

fn apply_env_overrides(config: &mut AgentConfig) {
    if let Ok(url) = std::env::var("LIVEKIT_URL") {
        config.livekit.url = url;
    }
    if let Ok(key) = std::env::var("LIVEKIT_API_KEY") {
        config.livekit.api_key = key;
    }
    if let Ok(secret) = std::env::var("LIVEKIT_API_SECRET") {
        config.livekit.api_secret = secret;
    }
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        config.openai.api_key = key;
    }
    if let Ok(model) = std::env::var("OPENAI_MODEL") {
        config.model.llm = model;
    }
    if let Ok(model) = std::env::var("OPENAI_TTS_MODEL") {
        config.model.tts = model;
    }
    if let Ok(model) = std::env::var("OPENAI_REALTIME_MODEL") {
        config.model.realtime = model;
    }
    if let Ok(room) = std::env::var("ROOM_NAME") {
        config.agent.room_name = room;
    }
    if let Ok(identity) = std::env::var("PARTICIPANT_IDENTITY") {
        config.agent.identity = identity;
    }
    if let Ok(enabled) = std::env::var("USE_BACKEND_ROUTER") {
        config.backend.enabled = parse_bool(&enabled);
    }
    if let Ok(url) = std::env::var("BACKEND_URL") {
        config.backend.url = url;
    }
    if let Ok(timeout) = std::env::var("BACKEND_TIMEOUT") {
        if let Ok(parsed) = timeout.parse() {
            config.backend.timeout_secs = parsed;
        }
    }
    if let Ok(level) = std::env::var("AIMEE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("AIMEE_LOG_JSON") {
        config.logging.json = parse_bool(&json);
    }
    if let Ok(dir) = std::env::var("AIMEE_PROMPTS_DIR") {
        config.prompts.dir = dir;
    }
}

fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

fn validate_required(config: &AgentConfig) -> Result<(), ConfigError> {
    let mut missing = Vec::new();
    if config.livekit.url.is_empty() {
        missing.push("livekit.url (LIVEKIT_URL)");
    }
    if config.livekit.api_key.is_empty() {
        missing.push("livekit.api_key (LIVEKIT_API_KEY)");
    }
    if config.livekit.api_secret.is_empty() {
        missing.push("livekit.api_secret (LIVEKIT_API_SECRET)");
    }
    if config.openai.api_key.is_empty() {
        missing.push("openai.api_key (OPENAI_API_KEY)");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::MissingRequired(missing.join(", ")))
    }
}

/// Logs the resolved configuration at startup, secrets redacted.
pub fn log_startup(config: &AgentConfig) {
    tracing::info!(
        livekit_url = %config.livekit.url,
        room = %config.agent.room_name,
        identity = %config.agent.identity,
        llm_model = %config.model.llm,
        backend_router = config.backend.enabled,
        backend_url = %config.backend.url,
        backend_timeout_secs = config.backend.timeout_secs,
        "agent configuration resolved"
    );
    tracing::info!(
        tts_model = %config.model.tts,
        realtime_model = %config.model.realtime,
        "reserved model configuration (not active in the current pipeline)"
    );
}
