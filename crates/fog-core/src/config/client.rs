//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::duration_secs;
use super::ServerConfig;

/// Name of the persisted security token file
pub const TOKEN_FILE_NAME: &str = "token.dat";

/// Configuration for the communication layer of the client service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server location
    pub server: ServerConfig,

    /// Where the protected security token is kept
    pub token_path: PathBuf,

    /// Key used to protect the token at rest (created on first use)
    pub token_key_path: PathBuf,

    /// The pinned CA certificate (PEM or DER) server certificates must chain to
    pub ca_cert_path: PathBuf,

    /// Scratch directory for downloaded server certificates
    pub temp_dir: PathBuf,

    /// How many times a request may re-authenticate after the server
    /// rejects the host certificate
    pub max_auth_retries: u32,

    /// Per-request timeout
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,

    /// Fixed MAC list to report instead of the host's interfaces
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_override: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let config_dir = super::default_config_dir();
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("fog"))
            .unwrap_or_else(|| config_dir.clone());

        Self {
            server: ServerConfig::default(),
            token_path: config_dir.join(TOKEN_FILE_NAME),
            token_key_path: data_dir.join("token.key"),
            ca_cert_path: config_dir.join("ca.cert.pem"),
            temp_dir: config_dir.join("tmp"),
            max_auth_retries: 1,
            request_timeout: Duration::from_secs(30),
            mac_override: None,
        }
    }
}

impl ClientConfig {
    /// Location the server certificate is downloaded to before authenticating
    pub fn server_cert_path(&self) -> PathBuf {
        self.temp_dir.join("public.crt")
    }
}
