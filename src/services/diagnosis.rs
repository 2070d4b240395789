//! Diagnosis Client
//!
//! Sends one encoded plant photo with a fixed instruction to the configured
//! provider and turns the reply into an `AnalysisResult`.

use std::sync::Arc;

use plant_doctor_core::diagnosis::ReplyParseError;
use plant_doctor_core::{parse_diagnosis_reply, AnalysisResult, DataUri, ReadError};
use plant_doctor_llm::{
    AnthropicProvider, BedrockProvider, LlmError, LlmProvider, LlmResult, Message, ProviderConfig,
    ProviderType,
};
use thiserror::Error;

/// Instruction sent alongside every image.
pub const DIAGNOSIS_PROMPT: &str = "Analyze this plant image for diseases, pests, or health issues. \
Respond with a single JSON object containing:
- disease: name of the disease or issue
- severity: \"Low\", \"Medium\", or \"High\"
- confidence: number between 0 and 100
- recommendations: array of 3-5 short, imperative treatment suggestions

If the plant appears healthy, set disease to \"Healthy\" and give care recommendations instead.";

/// Why a diagnosis attempt failed
#[derive(Error, Debug)]
pub enum DiagnosisError {
    /// The image could not be read or the transport text was malformed
    #[error(transparent)]
    Read(#[from] ReadError),

    /// The provider call failed
    #[error("Diagnosis request failed: {0}")]
    RemoteCall(#[from] LlmError),

    /// The reply held no usable diagnosis
    #[error("Could not read a diagnosis from the model reply: {reason}")]
    Parse { reason: String, raw: String },
}

/// Build the provider named by `config.provider`.
pub async fn create_provider(config: ProviderConfig) -> LlmResult<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config.provider {
        ProviderType::Bedrock => Arc::new(BedrockProvider::new(config).await?),
        ProviderType::Anthropic => Arc::new(AnthropicProvider::new(config)?),
    };
    Ok(provider)
}

/// Stateless client around one provider. Safe to share between sessions.
pub struct DiagnosisClient {
    provider: Arc<dyn LlmProvider>,
}

impl DiagnosisClient {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Provider name, for display
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Model identifier, for display
    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Diagnose the image carried by `transport_text` (`data:<mime>;base64,...`).
    ///
    /// Makes exactly one provider call. A reply without a parseable JSON
    /// object is an error, never a made-up result.
    pub async fn diagnose(&self, transport_text: &str) -> Result<AnalysisResult, DiagnosisError> {
        let data_uri = DataUri::parse(transport_text)?;

        if !self.provider.supports_multimodal() {
            return Err(DiagnosisError::RemoteCall(LlmError::InvalidRequest {
                message: format!(
                    "{} model '{}' does not accept images",
                    self.provider.name(),
                    self.provider.model()
                ),
            }));
        }

        tracing::info!(
            "[DiagnosisClient] Requesting diagnosis: provider={}, model={}, media_type={}, payload={} chars",
            self.provider.name(),
            self.provider.model(),
            data_uri.media_type,
            data_uri.payload.len()
        );

        let message = Message::user_with_image(data_uri.media_type, data_uri.payload, DIAGNOSIS_PROMPT);
        let response = self.provider.send_message(vec![message], None).await?;

        tracing::info!(
            "[DiagnosisClient] Response received: model={}, stop_reason={:?}, tokens={} ({} in / {} out)",
            response.model,
            response.stop_reason,
            response.usage.total_tokens(),
            response.usage.input_tokens,
            response.usage.output_tokens
        );

        let truncated = response.was_truncated();
        let raw = response.content.unwrap_or_default();

        parse_diagnosis_reply(&raw).map_err(|err| {
            let reason = describe_parse_failure(&err, truncated);
            tracing::warn!("[DiagnosisClient] {}", reason);
            DiagnosisError::Parse { reason, raw }
        })
    }
}

fn describe_parse_failure(err: &ReplyParseError, truncated: bool) -> String {
    if truncated {
        format!("{} (the reply was cut off by the output token limit)", err)
    } else {
        err.to_string()
    }
}
