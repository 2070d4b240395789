//! Anthropic Messages Format
//!
//! Request and response shapes shared by every backend that speaks the
//! Anthropic Messages API (the public endpoint and Bedrock's Claude models).

use serde::Deserialize;

use super::types::{LlmResponse, Message, MessageContent, MessageRole, StopReason, UsageStats};

/// Build the parts of a Messages request body common to every backend.
///
/// Callers add the backend-specific keys (`model`, `anthropic_version`).
pub fn build_messages_body(
    messages: &[Message],
    system: Option<&str>,
    max_tokens: u32,
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "max_tokens": max_tokens,
        "messages": messages.iter().map(message_to_claude).collect::<Vec<_>>(),
    });

    if let Some(sys) = system {
        body["system"] = serde_json::json!(sys);
    }

    body
}

/// Convert a Message to Claude API format
pub fn message_to_claude(message: &Message) -> serde_json::Value {
    let role = match message.role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    };

    let content: Vec<serde_json::Value> = message
        .content
        .iter()
        .map(|c| match c {
            MessageContent::Text { text } => serde_json::json!({
                "type": "text",
                "text": text
            }),
            MessageContent::Image { media_type, data } => serde_json::json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": media_type,
                    "data": data
                }
            }),
        })
        .collect();

    serde_json::json!({
        "role": role,
        "content": content
    })
}

/// Claude API response format
#[derive(Debug, Deserialize)]
pub struct ClaudeResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: ResponseUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    /// Thinking, tool use and anything newer; not part of the answer text.
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponseUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

impl ClaudeResponse {
    /// Convert into the provider-neutral response. Text blocks are joined
    /// with newlines; `fallback_model` fills in when the body omits it.
    pub fn into_llm_response(self, fallback_model: &str) -> LlmResponse {
        let texts: Vec<String> = self
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();

        let stop_reason = self
            .stop_reason
            .as_deref()
            .map(StopReason::from)
            .unwrap_or(StopReason::EndTurn);

        LlmResponse {
            content: if texts.is_empty() {
                None
            } else {
                Some(texts.join("\n"))
            },
            stop_reason,
            usage: UsageStats {
                input_tokens: self.usage.input_tokens,
                output_tokens: self.usage.output_tokens,
            },
            model: self.model.unwrap_or_else(|| fallback_model.to_string()),
        }
    }
}
