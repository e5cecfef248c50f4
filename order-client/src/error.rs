//! Client error types

use shared::message::FrameError;
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Bus connection failed
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// Wire protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] FrameError),

    /// The bus refused the message
    #[error("Publish rejected: {0}")]
    Rejected(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
