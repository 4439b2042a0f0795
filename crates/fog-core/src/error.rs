//! Core error types for the FOG client

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Security token storage errors
#[derive(Error, Debug)]
pub enum TokenError {
    /// No token has been stored yet
    #[error("Token file not found: {0}")]
    NotFound(PathBuf),

    /// The protection key could not be located or created
    #[error("Protection key unavailable: {0}")]
    KeyUnavailable(String),

    /// Sealing or opening the token failed
    #[error("Token protection failed: {0}")]
    Protection(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
