//! Server connection settings

use serde::{Deserialize, Serialize};

use crate::address::ServerAddress;
use crate::error::ConfigError;

/// Where the FOG server lives.
///
/// Every field is optional so that a partially written configuration can be
/// loaded and reported, rather than rejected at parse time. Resolution
/// requires all three.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Use `https://` instead of `http://`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https: Option<bool>,

    /// Server host name or IP (may include a port)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Path of the web application on the server, e.g. `/fog/`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_root: Option<String>,
}

impl ServerConfig {
    /// Create a fully specified server configuration
    pub fn new(https: bool, host: impl Into<String>, web_root: impl Into<String>) -> Self {
        Self {
            https: Some(https),
            host: Some(host.into()),
            web_root: Some(web_root.into()),
        }
    }

    /// Build the base server address.
    ///
    /// Fails if the TLS flag or web root is absent, or the host is absent or
    /// empty.
    pub fn resolve(&self) -> Result<ServerAddress, ConfigError> {
        let https = self
            .https
            .ok_or_else(|| ConfigError::MissingField("https".to_string()))?;
        let web_root = self
            .web_root
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField("web_root".to_string()))?;
        let host = self
            .host
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError::MissingField("host".to_string()))?;

        let scheme = if https { "https://" } else { "http://" };
        Ok(ServerAddress::new(format!("{}{}{}", scheme, host, web_root)))
    }
}
