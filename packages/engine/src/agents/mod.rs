//! The Proposer (C5) and Validator (C6) agents: thin wrappers around
//! the uniform [`crate::llm::LlmAdapter`] that add prompt construction,
//! schema validation, and the one-fallback-model retry policy.

pub mod proposer;
pub mod validator;

pub use proposer::{ProposerAgent, ProposerContext};
pub use validator::ValidatorAgent;
