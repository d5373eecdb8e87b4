//! Error types for the validator REST client.

use thiserror::Error;

/// Result type for validator client operations.
pub type Result<T> = std::result::Result<T, ValidatorClientError>;

#[derive(Debug, Error)]
pub enum ValidatorClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("response did not contain a tool_use content block")]
    EmptyResponse,

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}
