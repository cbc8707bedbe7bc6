//! Unified error type for the minerals dashboard.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("API error {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request cancelled: {0}")]
    Cancelled(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Projection data error: {0}")]
    Projections(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether a failed page request may be attempted again.
    ///
    /// Rate limiting (429), server errors (>= 500), transport failures and
    /// undecodable bodies are transient. Cancellation and every other status
    /// are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Status { status, .. } => *status == 429 || *status >= 500,
            Error::Transport(_) | Error::Json(_) => true,
            _ => false,
        }
    }
}
