//! Error types for the idobata client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// WebSocket connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// HTTP bulk read error
    #[error("API request failed: {0}")]
    Api(#[from] reqwest::Error),

    /// Local state directory error
    #[error("Local state error: {0}")]
    LocalState(#[from] std::io::Error),

    /// Local state decode error
    #[error("Failed to decode local state: {0}")]
    LocalStateDecode(#[from] serde_json::Error),

    /// Server rejected the login
    #[error("Login rejected: {0}")]
    LoginRejected(String),
}
