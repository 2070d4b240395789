//! Proxy Configuration
//!
//! Outbound proxy settings for the HTTP-based model provider. The client
//! factory that applies them lives in `plant-doctor-llm`.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Proxy protocol type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    Http,
    Https,
    Socks5,
    /// SOCKS5 with host names resolved by the proxy
    Socks5h,
}

impl ProxyProtocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            ProxyProtocol::Http => "http",
            ProxyProtocol::Https => "https",
            ProxyProtocol::Socks5 => "socks5",
            ProxyProtocol::Socks5h => "socks5h",
        }
    }

    fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "http" => Some(ProxyProtocol::Http),
            "https" => Some(ProxyProtocol::Https),
            "socks5" => Some(ProxyProtocol::Socks5),
            "socks5h" => Some(ProxyProtocol::Socks5h),
            _ => None,
        }
    }
}

/// Proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyConfig {
    pub protocol: ProxyProtocol,
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Only held in memory; never written back out.
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Parse `scheme://[user[:pass]@]host:port`, as found in proxy env vars.
    pub fn from_url(raw: &str) -> CoreResult<Self> {
        let parsed = url::Url::parse(raw.trim())
            .map_err(|e| CoreError::config(format!("Invalid proxy URL '{}': {}", raw, e)))?;

        let protocol = ProxyProtocol::from_scheme(parsed.scheme()).ok_or_else(|| {
            CoreError::config(format!("Unsupported proxy scheme: {}", parsed.scheme()))
        })?;
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| CoreError::config(format!("Proxy URL has no host: {}", raw)))?
            .to_string();
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| CoreError::config(format!("Proxy URL has no port: {}", raw)))?;

        let username = Some(parsed.username())
            .filter(|u| !u.is_empty())
            .map(decode_userinfo)
            .transpose()?;
        let password = parsed.password().map(decode_userinfo).transpose()?;

        Ok(Self {
            protocol,
            host,
            port,
            username,
            password,
        })
    }

    /// Proxy URL without credentials.
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol.scheme(), self.host, self.port)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.host.trim().is_empty() {
            return Err(CoreError::validation("Proxy host cannot be empty"));
        }
        if self.port == 0 {
            return Err(CoreError::validation("Proxy port cannot be 0"));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(CoreError::validation(
                "Proxy password given without a username",
            ));
        }
        Ok(())
    }
}

/// `Url` keeps userinfo percent-encoded; the proxy wants the plain text.
fn decode_userinfo(raw: &str) -> CoreResult<String> {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| CoreError::config(format!("Proxy credentials are not valid UTF-8: {}", e)))
}
