//! Unified error types for Crucible

use thiserror::Error;

/// Unified error type for all Crucible operations
#[derive(Error, Debug)]
pub enum CrucibleError {
    // Backend errors
    #[error("Backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("Backend request timed out: {0}")]
    Timeout(String),

    #[error("Backend returned status {status}: {body}")]
    BackendStatus { status: u16, body: String },

    #[error("Malformed backend payload: {0}")]
    MalformedPayload(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    // Agent errors
    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Invalid extraction pattern: {0}")]
    Pattern(String),

    // Orchestrator errors
    #[error("Orchestrator error: {0}")]
    Orchestrator(String),

    // Metrics errors
    #[error("Metrics error: {0}")]
    Metrics(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl CrucibleError {
    /// Whether a generation request that failed this way is worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::BackendUnreachable(_)
                | Self::Timeout(_)
                | Self::BackendStatus { .. }
                | Self::MalformedPayload(_)
        )
    }
}

/// Result type alias using CrucibleError
pub type Result<T> = std::result::Result<T, CrucibleError>;
