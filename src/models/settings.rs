//! Settings Models
//!
//! Application configuration: which provider diagnoses the image, how to
//! reach it, and the output budget for a single reply.

use std::fmt;

use plant_doctor_core::ProxyConfig;
use plant_doctor_llm::{AwsCredentials, ProviderConfig, ProviderType, DEFAULT_MAX_TOKENS};
use serde::{Deserialize, Serialize};

/// Default Bedrock model for image diagnosis
pub const DEFAULT_BEDROCK_MODEL: &str = "anthropic.claude-3-5-sonnet-20240620-v1:0";

/// Default model for the direct Anthropic API
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Upper bound accepted for `max_tokens`
const MAX_TOKENS_CEILING: u32 = 8192;

/// Application configuration, loaded from the environment or a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which backend answers the diagnosis request
    #[serde(default = "default_provider")]
    pub provider: ProviderType,
    #[serde(default)]
    pub bedrock: BedrockSettings,
    #[serde(default)]
    pub anthropic: AnthropicSettings,
    /// Output budget for one reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Proxy for the direct Anthropic API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
}

fn default_provider() -> ProviderType {
    ProviderType::Bedrock
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_bedrock_model() -> String {
    DEFAULT_BEDROCK_MODEL.to_string()
}

fn default_anthropic_model() -> String {
    DEFAULT_ANTHROPIC_MODEL.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            bedrock: BedrockSettings::default(),
            anthropic: AnthropicSettings::default(),
            max_tokens: default_max_tokens(),
            proxy: None,
        }
    }
}

/// AWS Bedrock connection settings
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BedrockSettings {
    #[serde(default)]
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(default = "default_bedrock_model")]
    pub model_id: String,
}

impl Default for BedrockSettings {
    fn default() -> Self {
        Self {
            region: String::new(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            model_id: default_bedrock_model(),
        }
    }
}

impl fmt::Debug for BedrockSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BedrockSettings")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "<redacted>"))
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("model_id", &self.model_id)
            .finish()
    }
}

/// Direct Anthropic API settings
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnthropicSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_anthropic_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_anthropic_model(),
            base_url: None,
        }
    }
}

impl fmt::Debug for AnthropicSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AppConfig {
    /// Build configuration from process environment variables.
    ///
    /// Callers load `.env` first (`dotenvy::dotenv()`).
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Each setting is read from its plain name first, then from the
    /// `VITE_`-prefixed name older deployments used.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .or_else(|| lookup(&format!("VITE_{}", key)))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = match get("PLANT_DOCTOR_PROVIDER") {
            Some(raw) => raw.parse::<ProviderType>()?,
            None => default_provider(),
        };

        let max_tokens = match get("PLANT_DOCTOR_MAX_TOKENS") {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| format!("Invalid PLANT_DOCTOR_MAX_TOKENS: {}", raw))?,
            None => default_max_tokens(),
        };

        let proxy = match get("PLANT_DOCTOR_PROXY") {
            Some(raw) => Some(ProxyConfig::from_url(&raw).map_err(|e| e.to_string())?),
            None => None,
        };

        let config = Self {
            provider,
            bedrock: BedrockSettings {
                region: get("AWS_REGION").unwrap_or_default(),
                access_key_id: get("AWS_ACCESS_KEY_ID"),
                secret_access_key: get("AWS_SECRET_ACCESS_KEY"),
                session_token: get("AWS_SESSION_TOKEN"),
                model_id: get("BEDROCK_MODEL_ID").unwrap_or_else(default_bedrock_model),
            },
            anthropic: AnthropicSettings {
                api_key: get("ANTHROPIC_API_KEY"),
                model: get("ANTHROPIC_MODEL").unwrap_or_else(default_anthropic_model),
                base_url: get("ANTHROPIC_BASE_URL"),
            },
            max_tokens,
            proxy,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_tokens == 0 || self.max_tokens > MAX_TOKENS_CEILING {
            return Err(format!(
                "max_tokens must be between 1 and {}, got {}",
                MAX_TOKENS_CEILING, self.max_tokens
            ));
        }

        match self.provider {
            ProviderType::Bedrock => {
                if self.bedrock.region.trim().is_empty() {
                    return Err("AWS region is required for the bedrock provider".to_string());
                }
                if self.bedrock.model_id.trim().is_empty() {
                    return Err("Bedrock model id cannot be empty".to_string());
                }
                if self.bedrock.access_key_id.is_some() != self.bedrock.secret_access_key.is_some()
                {
                    return Err(
                        "AWS access key id and secret access key must be set together".to_string(),
                    );
                }
            }
            ProviderType::Anthropic => {
                if self.anthropic.api_key.is_none() {
                    return Err("ANTHROPIC_API_KEY is required for the anthropic provider".to_string());
                }
                if self.anthropic.model.trim().is_empty() {
                    return Err("Anthropic model cannot be empty".to_string());
                }
            }
        }

        if let Some(proxy) = &self.proxy {
            proxy.validate().map_err(|e| e.to_string())?;
        }

        Ok(())
    }

    /// Resolve the provider configuration for the selected backend
    pub fn provider_config(&self) -> ProviderConfig {
        match self.provider {
            ProviderType::Bedrock => {
                let aws_credentials = match (
                    &self.bedrock.access_key_id,
                    &self.bedrock.secret_access_key,
                ) {
                    (Some(id), Some(secret)) => Some(AwsCredentials {
                        access_key_id: id.clone(),
                        secret_access_key: secret.clone(),
                        session_token: self.bedrock.session_token.clone(),
                    }),
                    _ => None,
                };
                ProviderConfig {
                    provider: ProviderType::Bedrock,
                    model: self.bedrock.model_id.clone(),
                    max_tokens: self.max_tokens,
                    region: Some(self.bedrock.region.clone()),
                    aws_credentials,
                    ..Default::default()
                }
            }
            ProviderType::Anthropic => ProviderConfig {
                provider: ProviderType::Anthropic,
                model: self.anthropic.model.clone(),
                max_tokens: self.max_tokens,
                api_key: self.anthropic.api_key.clone(),
                base_url: self.anthropic.base_url.clone(),
                proxy: self.proxy.clone(),
                ..Default::default()
            },
        }
    }
}
