// ABOUTME: Errors from container engine calls.
// ABOUTME: Classifies HTTP status codes and call timeouts for callers to match on.

use std::time::Duration;

/// Failure of a single engine primitive (create, start, attach, wait, ...).
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{operation} timed out after {}s", .timeout.as_secs())]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("engine error: {0}")]
    Api(String),
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }
}
