//! Concrete [`LlmAdapter`](super::LlmAdapter) bindings, one per vendor
//! client. Feature-gated so a build only pulls in the wire clients it
//! actually uses.

use super::{Invocation, LlmAdapter};
use crate::error::AgentError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

#[cfg(feature = "proposer-openai")]
pub struct OpenAiAdapter {
    client: proposer_client::ProposerClient,
}

#[cfg(feature = "proposer-openai")]
impl OpenAiAdapter {
    pub fn new(client: proposer_client::ProposerClient) -> Self {
        Self { client }
    }
}

#[cfg(feature = "proposer-openai")]
#[async_trait]
impl LlmAdapter for OpenAiAdapter {
    fn provider(&self) -> &str {
        "openai"
    }

    async fn invoke(
        &self,
        model: &str,
        prompt: &str,
        schema: &Value,
        timeout: Duration,
    ) -> Result<Invocation, AgentError> {
        let completion = self
            .client
            .complete_json(model, prompt, schema, timeout)
            .await
            .map_err(map_proposer_error(timeout))?;

        let json: Value = serde_json::from_str(&completion.text)
            .map_err(|e| AgentError::SchemaViolation(e.to_string()))?;

        Ok(Invocation {
            json,
            input_tokens: completion.usage.input_tokens as u64,
            output_tokens: completion.usage.output_tokens as u64,
            raw_text: completion.text,
            latency: completion.latency,
        })
    }
}

#[cfg(feature = "proposer-openai")]
fn map_proposer_error(timeout: Duration) -> impl Fn(proposer_client::ProposerClientError) -> AgentError {
    move |e| match e {
        proposer_client::ProposerClientError::Timeout(_) => AgentError::Timeout(timeout),
        other => AgentError::Transport(other.to_string()),
    }
}

#[cfg(feature = "validator-anthropic")]
pub struct AnthropicAdapter {
    client: validator_client::ValidatorClient,
    max_tokens: u32,
}

#[cfg(feature = "validator-anthropic")]
impl AnthropicAdapter {
    pub fn new(client: validator_client::ValidatorClient) -> Self {
        Self { client, max_tokens: 4096 }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[cfg(feature = "validator-anthropic")]
#[async_trait]
impl LlmAdapter for AnthropicAdapter {
    fn provider(&self) -> &str {
        "anthropic"
    }

    async fn invoke(
        &self,
        model: &str,
        prompt: &str,
        schema: &Value,
        timeout: Duration,
    ) -> Result<Invocation, AgentError> {
        let completion = self
            .client
            .complete_json(model, prompt, schema, self.max_tokens, timeout)
            .await
            .map_err(map_validator_error(timeout))?;

        let json: Value = serde_json::from_str(&completion.text)
            .map_err(|e| AgentError::SchemaViolation(e.to_string()))?;

        Ok(Invocation {
            json,
            input_tokens: completion.usage.input_tokens as u64,
            output_tokens: completion.usage.output_tokens as u64,
            raw_text: completion.text,
            latency: completion.latency,
        })
    }
}

#[cfg(feature = "validator-anthropic")]
fn map_validator_error(timeout: Duration) -> impl Fn(validator_client::ValidatorClientError) -> AgentError {
    move |e| match e {
        validator_client::ValidatorClientError::Timeout(_) => AgentError::Timeout(timeout),
        other => AgentError::Transport(other.to_string()),
    }
}
