use thiserror::Error;

/// Errors from session construction and the transport surface.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("session start failed: {0}")]
    Start(String),
}
