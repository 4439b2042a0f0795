//! Error types for the communication layer

use std::path::PathBuf;

use fog_core::{ConfigError, TokenError};
use fog_protocol::{EnvelopeError, ReturnCode};
use thiserror::Error;

/// Top-level error for the FOG client communication layer
#[derive(Error, Debug)]
pub enum FogError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Request error
    #[error("Communication error: {0}")]
    Comm(#[from] CommError),

    /// Certificate trust error
    #[error("Trust error: {0}")]
    Trust(#[from] TrustError),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Token storage error
    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

/// Failures of the underlying HTTP exchange
#[derive(Error, Debug)]
pub enum HttpError {
    /// DNS, connect, TLS or timeout failure
    #[error("Request failed: {0}")]
    Request(String),

    /// Server answered with a non-success HTTP status
    #[error("HTTP status {0}")]
    Status(u16),

    /// Local I/O failure while streaming a body
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => HttpError::Status(status.as_u16()),
            None => HttpError::Request(e.to_string()),
        }
    }
}

/// Errors returned by request primitives
#[derive(Error, Debug)]
pub enum CommError {
    /// No server address has been resolved, nothing was sent
    #[error("Server address is not resolved")]
    AddressUnresolved,

    /// The server could not be reached or answered badly
    #[error("Could not contact FOG server: {0}")]
    Http(#[from] HttpError),

    /// The reply envelope could not be opened
    #[error("Could not decode reply: {0}")]
    Envelope(#[from] EnvelopeError),

    /// The server kept rejecting the host certificate after re-authenticating
    #[error("Host certificate still rejected after {attempts} re-authentication attempt(s)")]
    RetriesExhausted { attempts: u32 },

    /// Caller passed an empty URL or destination
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The download finished but the destination file is absent
    #[error("Downloaded file missing at {0}")]
    MissingDownload(PathBuf),

    /// Local I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Certificate trust errors
#[derive(Error, Debug)]
pub enum TrustError {
    /// Certificate file could not be read
    #[error("Could not read certificate {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No certificate found in a PEM file
    #[error("No certificate found in PEM data")]
    EmptyPem,

    /// Certificate DER could not be parsed
    #[error("Invalid certificate: {0}")]
    Parse(String),

    /// Certificate does not chain to the pinned CA
    #[error("Certificate is not from the pinned CA: {0}")]
    Untrusted(String),

    /// Certificate is outside its validity window
    #[error("Certificate is not currently valid")]
    Expired,

    /// Certificate does not carry a usable RSA public key
    #[error("Unsupported public key: {0}")]
    PublicKey(String),

    /// RSA encryption failed
    #[error("RSA encryption failed: {0}")]
    Encrypt(String),
}

/// Authentication failures
#[derive(Error, Debug)]
pub enum AuthError {
    /// A request made during authentication failed
    #[error(transparent)]
    Comm(#[from] CommError),

    /// The server certificate is not trusted
    #[error(transparent)]
    Trust(#[from] TrustError),

    /// The server refused the key exchange
    #[error("Server rejected authentication: {code}")]
    Rejected { code: ReturnCode },

    /// The success reply carried no token
    #[error("Authorization reply has no token field")]
    MissingToken,

    /// The token field is not valid hex
    #[error("Authorization reply token is not hex: {0}")]
    TokenEncoding(#[from] hex::FromHexError),
}
