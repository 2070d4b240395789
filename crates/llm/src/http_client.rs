//! HTTP Client Factory
//!
//! Builds the reqwest client used by the HTTP-based provider.

use std::time::Duration;

use plant_doctor_core::proxy::ProxyConfig;

use super::types::{LlmError, LlmResult};

/// Vision requests with a 5 MiB image can take a while to upload and answer.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Build a `reqwest::Client` with the resolved proxy configuration.
///
/// - `Some(proxy)` -> route everything through the proxy
/// - `None` -> explicitly disable proxy (`no_proxy`), ignoring env vars
pub fn build_http_client(proxy: Option<&ProxyConfig>) -> LlmResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);
    match proxy {
        Some(cfg) => {
            let mut p = reqwest::Proxy::all(cfg.url()).map_err(|e| {
                LlmError::ProviderUnavailable {
                    message: format!("Invalid proxy {}: {}", cfg.url(), e),
                }
            })?;
            if let (Some(u), Some(pw)) = (&cfg.username, &cfg.password) {
                p = p.basic_auth(u, pw);
            }
            builder = builder.proxy(p);
        }
        None => {
            builder = builder.no_proxy();
        }
    }
    builder.build().map_err(|e| LlmError::ProviderUnavailable {
        message: format!("Failed to build HTTP client: {}", e),
    })
}
