use thiserror::Error;

/// Message surfaced when the model answers with something that is not the
/// JSON shape we asked for.
pub const INVALID_FORMAT_MESSAGE: &str = "Received an invalid format from the AI.";

#[derive(Debug, Error)]
pub enum AnnapurnaError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("AI service error: {0}")]
    Ai(String),

    #[error("{0}")]
    InvalidFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AnnapurnaError {
    /// Returns `true` for failures that came from talking to the AI service
    /// (transport, HTTP status, or an unusable answer).
    pub fn is_ai_failure(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Ai(_) | Self::InvalidFormat(_))
    }
}

pub type Result<T> = std::result::Result<T, AnnapurnaError>;
