//! Wire types for the chat completions REST API.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseRaw {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Message {
    pub content: String,
}

/// Token usage reported by the provider for one completion call.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(rename = "prompt_tokens", default)]
    pub input_tokens: u32,
    #[serde(rename = "completion_tokens", default)]
    pub output_tokens: u32,
}

/// The result of a single completion call: raw text plus call metadata.
///
/// Deliberately does not attempt to parse `text` as JSON — schema
/// validation and fallback-model retry policy belong to the caller.
#[derive(Debug, Clone)]
pub struct RawCompletion {
    pub text: String,
    pub usage: Usage,
    pub latency: Duration,
}
