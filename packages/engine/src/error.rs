//! Error taxonomy (library errors, via `thiserror`).
//!
//! Recoverable conditions (agent parse/timeout failures, store
//! contention) are handled inside the owning component and folded into
//! its structured output — they never reach [`OrchestrationError`].
//! Only fetch/parse/deadline/loop-bound conditions cross the request
//! boundary as `ok=false`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while running an agent (Proposer or Validator)
/// call. Handled by the calling component via one fallback-model retry;
/// never surfaced directly to the caller.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent response violated the response schema: {0}")]
    SchemaViolation(String),

    #[error("agent call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("transport error calling agent: {0}")]
    Transport(String),
}

/// Errors from the Selector Store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a record for site {0:?} already exists")]
    AlreadyExists(String),

    #[error("no record for site {0:?}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Top-level errors that end a request with `ok=false`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("DOM unparseable: {0}")]
    Parse(String),

    #[error("request deadline elapsed")]
    BudgetExceeded,

    #[error("loop bound reached")]
    LoopBound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),
}
