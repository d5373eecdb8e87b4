//! Pure OpenAI-shaped chat completions REST client.
//!
//! A clean, minimal client with no domain-specific logic. It speaks the
//! `/chat/completions` wire format with a JSON-schema-constrained
//! response format and returns the raw text, token usage, and latency of
//! the call — callers decide how to parse and validate the payload.
//!
//! This crate hosts one vendor family behind the engine's LLM adapter
//! interface; `validator-client` hosts a second, distinct family so the
//! two roles are never backed by the same provider.

pub mod error;
mod types;

pub use error::{ProposerClientError, Result};
pub use types::{RawCompletion, Usage};

use secrecy::{ExposeSecret, SecretString};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Pure OpenAI-shaped chat completions client.
#[derive(Clone)]
pub struct ProposerClient {
    http_client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl ProposerClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key: SecretString::from(api_key.into()),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from the `PROPOSER_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("PROPOSER_API_KEY")
            .map_err(|_| ProposerClientError::Config("PROPOSER_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Use a custom base URL (proxies, Azure-style deployments, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Send a single prompt and ask for a JSON object matching `schema`.
    ///
    /// Returns the raw response text (not yet parsed/validated against
    /// `schema` — that is the caller's job) along with token usage and
    /// wall-clock latency.
    pub async fn complete_json(
        &self,
        model: &str,
        prompt: &str,
        schema: &serde_json::Value,
        timeout: Duration,
    ) -> Result<RawCompletion> {
        let body = serde_json::json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "response",
                    "schema": schema,
                    "strict": true,
                },
            },
        });

        let start = Instant::now();
        let send = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key.expose_secret()))
            .header("Content-Type", "application/json")
            .json(&body)
            .send();

        let response = tokio::time::timeout(timeout, send)
            .await
            .map_err(|_| ProposerClientError::Timeout(timeout))?
            .map_err(|e| {
                warn!(error = %e, "proposer request failed");
                ProposerClientError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "proposer API error");
            return Err(ProposerClientError::Api(error_text));
        }

        let raw: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| ProposerClientError::Api(e.to_string()))?;

        let latency = start.elapsed();
        let content = raw
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(ProposerClientError::EmptyResponse)?;

        debug!(model, latency_ms = latency.as_millis(), "proposer completion");

        Ok(RawCompletion {
            text: content,
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
        let client = ProposerClient::new("sk-test").with_base_url("https://custom.api.com");
        assert_eq!(client.base_url, "https://custom.api.com");
    }
}
