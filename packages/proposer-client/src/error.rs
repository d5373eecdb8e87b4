//! Error types for the proposer REST client.

use thiserror::Error;

/// Result type for proposer client operations.
pub type Result<T> = std::result::Result<T, ProposerClientError>;

/// Errors raised by the pure REST client, before the engine's own
/// agent-level fallback/retry policy gets a chance to run.
#[derive(Debug, Error)]
pub enum ProposerClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("response did not contain a message body")]
    EmptyResponse,

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}
