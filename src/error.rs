//! Error types for the fraud investigation agent

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {

    // =============================
    // Evidence Store Errors
    // =============================

    /// An evidence collection is missing or uninitialized. Fatal: the run
    /// can never gather evidence, so it aborts immediately.
    #[error("Evidence collection not found: {0}")]
    NotFound(String),

    /// Evidence source failed at query time. Recoverable: recorded as a
    /// `ToolError` evidence entry and the run continues.
    #[error("Tool error: {0}")]
    ToolError(String),

    // =============================
    // Tool Registry Errors
    // =============================

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    // =============================
    // Reasoning Driver Errors
    // =============================

    /// Model output could not be parsed into a decision. Retried once
    /// with a corrective prompt before escalating to `DriverUnavailable`.
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Rate limited by model provider: {0}")]
    RateLimited(String),

    #[error("Transient API error: {0}")]
    TransientApiError(String),

    /// Driver failed past its retry budget. Fatal for the run.
    #[error("Reasoning driver unavailable: {0}")]
    DriverUnavailable(String),

    /// Model reported a confidence outside [0,1]. Fatal contract violation.
    #[error("Invalid confidence score: {0}")]
    InvalidConfidence(f64),

    // =============================
    // Persistence Errors
    // =============================

    #[error("Brief persistence error: {0}")]
    PersistenceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("UUID parse error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AgentError {
    /// True for driver-side errors that are retried with backoff before
    /// the run is aborted.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::RateLimited(_) | AgentError::TransientApiError(_)
        )
    }
}
