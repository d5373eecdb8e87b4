//! Uniform LLM adapter interface.
//!
//! `Invoke(provider, model, prompt, schema, timeout)` is the only way
//! the rest of the crate talks to a language model. The core does not
//! depend on any particular provider; concrete bindings live in
//! [`adapters`], feature-gated so a build can omit vendor clients it
//! doesn't need.

pub mod adapters;

use crate::error::AgentError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// One successful model call, parsed into a JSON object per `schema`.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub json: Value,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub raw_text: String,
    pub latency: Duration,
}

/// Bookkeeping the Orchestrator needs to record one Cost Meter entry
/// per LLM call, regardless of whether that call ultimately succeeded.
#[derive(Debug, Clone)]
pub struct AgentCallMeta {
    pub provider: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A provider-bound adapter. The Proposer and Validator each hold one,
/// and the two MUST be distinct vendor families — that heterogeneity is
/// a property of which adapters are wired in, not of this trait.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Human-readable vendor identity, e.g. `"openai"` or `"anthropic"`.
    fn provider(&self) -> &str;

    async fn invoke(
        &self,
        model: &str,
        prompt: &str,
        schema: &Value,
        timeout: Duration,
    ) -> Result<Invocation, AgentError>;
}
