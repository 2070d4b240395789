//! Plant Doctor LLM
//!
//! Provides a unified interface for sending an image plus an instruction to a
//! hosted vision model:
//! - Anthropic Claude on AWS Bedrock (`InvokeModel`)
//! - Anthropic Claude via the public Messages API
//!
//! Also includes the shared Messages request/response format and the HTTP
//! client factory.

pub mod anthropic;
pub mod bedrock;
pub mod http_client;
pub mod messages_api;
pub mod provider;
pub mod types;

// Re-export main types
pub use anthropic::AnthropicProvider;
pub use bedrock::BedrockProvider;
pub use http_client::build_http_client;
pub use provider::LlmProvider;
pub use types::*;
