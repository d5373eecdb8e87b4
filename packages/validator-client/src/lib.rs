//! Pure Anthropic-shaped messages REST client.
//!
//! A clean, minimal client with no domain-specific logic. It speaks the
//! `/messages` wire format, forcing a single tool call to obtain a JSON
//! object matching a caller-supplied schema, and returns raw text plus
//! token usage and latency — callers decide how to parse and validate
//! the payload.
//!
//! This is the Validator's vendor family: structurally parallel to
//! `proposer-client` but a distinct provider, so the two roles never
//! collapse onto the same model identity.

pub mod error;
mod types;

pub use error::{Result, ValidatorClientError};
pub use types::{RawCompletion, Usage};

use secrecy::{ExposeSecret, SecretString};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use types::ContentBlock;

/// Pure Anthropic-shaped messages client.
#[derive(Clone)]
pub struct ValidatorClient {
    http_client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    api_version: String,
}

impl ValidatorClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key: SecretString::from(api_key.into()),
            base_url: "https://api.anthropic.com/v1".to_string(),
            api_version: "2023-06-01".to_string(),
        }
    }

    /// Create from the `VALIDATOR_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("VALIDATOR_API_KEY")
            .map_err(|_| ValidatorClientError::Config("VALIDATOR_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Use a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Send a single prompt and force a tool call returning a JSON object
    /// matching `schema`.
    pub async fn complete_json(
        &self,
        model: &str,
        prompt: &str,
        schema: &serde_json::Value,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<RawCompletion> {
        let body = serde_json::json!({
            "model": model,
            "max_tokens": max_tokens,
            "messages": [{"role": "user", "content": prompt}],
            "tools": [{
                "name": "respond",
                "description": "Return the structured response.",
                "input_schema": schema,
            }],
            "tool_choice": {"type": "tool", "name": "respond"},
        });

        let start = Instant::now();
        let send = self
            .http_client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", &self.api_version)
            .header("Content-Type", "application/json")
            .json(&body)
            .send();

        let response = tokio::time::timeout(timeout, send)
            .await
            .map_err(|_| ValidatorClientError::Timeout(timeout))?
            .map_err(|e| {
                warn!(error = %e, "validator request failed");
                ValidatorClientError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "validator API error");
            return Err(ValidatorClientError::Api(error_text));
        }

        let raw: types::MessagesResponseRaw = response
            .json()
            .await
            .map_err(|e| ValidatorClientError::Api(e.to_string()))?;

        let latency = start.elapsed();
        let text = raw
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::ToolUse { input } => Some(input.to_string()),
                ContentBlock::Text { .. } => None,
            })
            .ok_or(ValidatorClientError::EmptyResponse)?;

        debug!(model, latency_ms = latency.as_millis(), "validator completion");

        Ok(RawCompletion {
            text,
            usage: raw.usage.unwrap_or_default(),
            latency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = ValidatorClient::new("sk-test").with_base_url("https://custom.api.com");
        assert_eq!(client.base_url, "https://custom.api.com");
    }
}
