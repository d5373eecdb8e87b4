//! Wire types for the messages REST API.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub(crate) struct MessagesResponseRaw {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentBlock {
    Text { text: String },
    ToolUse { input: serde_json::Value },
}

/// Token usage reported by the provider for one completion call.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(rename = "input_tokens", default)]
    pub input_tokens: u32,
    #[serde(rename = "output_tokens", default)]
    pub output_tokens: u32,
}

/// The result of a single completion call: raw JSON text plus call
/// metadata. The `tool_use` block's `input` object is re-serialized to
/// text so callers have one uniform `RawCompletion` shape regardless of
/// vendor.
#[derive(Debug, Clone)]
pub struct RawCompletion {
    pub text: String,
    pub usage: Usage,
    pub latency: Duration,
}
