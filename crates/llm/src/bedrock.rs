//! AWS Bedrock Provider
//!
//! Runs Anthropic models through Bedrock's `InvokeModel` operation. The body
//! is the Messages format with Bedrock's `anthropic_version` marker instead
//! of a `model` key; the model id travels in the request path.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_bedrockruntime::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_bedrockruntime::operation::invoke_model::InvokeModelError;
use aws_sdk_bedrockruntime::primitives::Blob;

use super::messages_api::{build_messages_body, ClaudeResponse};
use super::provider::LlmProvider;
use super::types::{LlmError, LlmResponse, LlmResult, Message, ProviderConfig};

/// Messages API version string Bedrock expects in the body
pub const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Provider name attached to static credentials
const CREDENTIALS_PROVIDER_NAME: &str = "plant-doctor";

/// Bedrock-hosted Claude provider
pub struct BedrockProvider {
    config: ProviderConfig,
    client: aws_sdk_bedrockruntime::Client,
}

impl BedrockProvider {
    /// Build a provider from configuration.
    ///
    /// Uses the explicit credentials when present, otherwise the default AWS
    /// credential chain (env, profile, instance metadata).
    pub async fn new(config: ProviderConfig) -> LlmResult<Self> {
        let region = config
            .region
            .clone()
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| LlmError::ProviderUnavailable {
                message: "AWS region not configured for bedrock".to_string(),
            })?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region));
        if let Some(creds) = &config.aws_credentials {
            loader = loader.credentials_provider(Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                creds.session_token.clone(),
                None,
                CREDENTIALS_PROVIDER_NAME,
            ));
        } else {
            tracing::debug!("[Bedrock] No static credentials, using default AWS chain");
        }

        let sdk_config = loader.load().await;
        let client = aws_sdk_bedrockruntime::Client::new(&sdk_config);
        Ok(Self { config, client })
    }

    /// Wrap an already configured SDK client.
    pub fn with_client(config: ProviderConfig, client: aws_sdk_bedrockruntime::Client) -> Self {
        Self { config, client }
    }

    /// Build the request body for InvokeModel
    fn build_request_body(&self, messages: &[Message], system: Option<&str>) -> serde_json::Value {
        let mut body = build_messages_body(messages, system, self.config.max_tokens);
        body["anthropic_version"] = serde_json::json!(BEDROCK_ANTHROPIC_VERSION);
        body
    }
}

#[async_trait]
impl LlmProvider for BedrockProvider {
    fn name(&self) -> &'static str {
        "bedrock"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn supports_multimodal(&self) -> bool {
        true
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
    ) -> LlmResult<LlmResponse> {
        let body = self.build_request_body(&messages, system.as_deref());
        let payload = serde_json::to_vec(&body).map_err(|e| LlmError::InvalidRequest {
            message: format!("Failed to serialize request: {}", e),
        })?;

        tracing::info!(
            "[Bedrock] Invoking model={} ({} byte body, max_tokens={})",
            self.config.model,
            payload.len(),
            self.config.max_tokens
        );

        let output = self
            .client
            .invoke_model()
            .model_id(&self.config.model)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(payload))
            .send()
            .await
            .map_err(|e| map_sdk_error(&e, &self.config.model))?;

        let claude_response: ClaudeResponse = serde_json::from_slice(output.body().as_ref())
            .map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse Bedrock response: {}", e),
            })?;

        Ok(claude_response.into_llm_response(&self.config.model))
    }
}

/// Bedrock service faults, keyed off the AWS error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BedrockFault {
    AccessDenied,
    Throttled,
    Validation,
    ModelNotFound,
    ModelBusy,
    Internal,
    Unknown,
}

fn fault_from_code(code: &str) -> BedrockFault {
    match code {
        "AccessDeniedException"
        | "UnrecognizedClientException"
        | "ExpiredTokenException"
        | "InvalidSignatureException" => BedrockFault::AccessDenied,
        "ThrottlingException" | "ServiceQuotaExceededException" => BedrockFault::Throttled,
        "ValidationException" => BedrockFault::Validation,
        "ResourceNotFoundException" => BedrockFault::ModelNotFound,
        "ModelNotReadyException" | "ModelTimeoutException" | "ServiceUnavailableException" => {
            BedrockFault::ModelBusy
        }
        "InternalServerException" | "ModelErrorException" => BedrockFault::Internal,
        _ => BedrockFault::Unknown,
    }
}

fn fault_to_llm_error(fault: BedrockFault, status: u16, message: String, model: &str) -> LlmError {
    match fault {
        BedrockFault::AccessDenied => LlmError::AuthenticationFailed {
            message: format!("bedrock: {}", message),
        },
        BedrockFault::Throttled => LlmError::RateLimited { message },
        BedrockFault::Validation => LlmError::InvalidRequest { message },
        BedrockFault::ModelNotFound => LlmError::ModelNotFound {
            model: format!("{} ({})", model, message),
        },
        BedrockFault::ModelBusy | BedrockFault::Internal => LlmError::ServerError {
            message,
            status: Some(status),
        },
        BedrockFault::Unknown => LlmError::Other {
            message: format!("HTTP {}: {}", status, message),
        },
    }
}

fn map_sdk_error(err: &SdkError<InvokeModelError>, model: &str) -> LlmError {
    match err {
        SdkError::ServiceError(service_err) => {
            let inner = service_err.err();
            let status = service_err.raw().status().as_u16();
            let code = inner.code().unwrap_or("Unknown");
            let message = inner.message().unwrap_or(code).to_string();
            tracing::warn!("[Bedrock] InvokeModel failed: {} (HTTP {})", code, status);
            fault_to_llm_error(fault_from_code(code), status, message, model)
        }
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => LlmError::NetworkError {
            message: DisplayErrorContext(err).to_string(),
        },
        _ => LlmError::Other {
            message: DisplayErrorContext(err).to_string(),
        },
    }
}
