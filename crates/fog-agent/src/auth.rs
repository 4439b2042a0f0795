//! Authentication handshake
//!
//! Establishes a fresh session key with the server:
//!
//! 1. Download the server certificate
//! 2. Generate a candidate session key and load the stored security token
//! 3. Refuse to continue unless the certificate was issued by the pinned CA
//! 4. RSA-encrypt key and token to the certificate and POST them, with the
//!    host's MAC list, to the authorization endpoint
//! 5. On success, adopt the key and persist the renewed token
//!
//! A host the server does not know yet (`#!ih`) is asked to register itself;
//! the registration outcome is not awaited.

use fog_core::address::append_query;
use fog_core::host;
use fog_protocol::{envelope, ReturnCode, SessionKey};

use crate::client::Communicator;
use crate::error::AuthError;
use crate::transport::{classify, decode_failed};
use crate::trust::{self, ServerCertificate};

/// Server certificate download location
pub const CERTIFICATE_ENDPOINT: &str = "/management/other/ssl/srvpublic.crt";

/// Key exchange endpoint
pub const AUTHORIZE_ENDPOINT: &str = "/management/index.php?sub=authorize";

/// Host self-registration endpoint
pub const REGISTER_ENDPOINT: &str = "/service/register.php";

/// Reply field carrying the renewed security token (hex)
pub const TOKEN_FIELD: &str = "#token";

impl Communicator {
    /// Negotiate a new session key with the server.
    ///
    /// Returns true on success. Every failure is logged.
    pub fn authenticate(&self) -> bool {
        match self.try_authenticate() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Could not authenticate: {}", e);
                false
            }
        }
    }

    /// Negotiate a new session key, reporting why it failed.
    ///
    /// The current session key is only replaced once the server accepts the
    /// new one; a failed attempt leaves the session as it was.
    pub fn try_authenticate(&self) -> Result<(), AuthError> {
        let cert_path = &self.options.server_cert_path;
        self.download_file(CERTIFICATE_ENDPOINT, cert_path)?;

        let candidate = SessionKey::generate();
        let token = self.tokens.load();

        let certificate = ServerCertificate::from_file(cert_path)?;
        certificate.verify(&self.ca)?;
        tracing::info!("Cert OK ({})", certificate.fingerprint());

        let public_key = certificate.public_key()?;
        let encrypted_key = hex::encode(trust::encrypt(&public_key, candidate.as_bytes())?);
        let encrypted_token = hex::encode(trust::encrypt(&public_key, &token)?);
        let macs = self.macs.mac_addresses();

        let raw = self.post_raw(
            AUTHORIZE_ENDPOINT,
            &[
                ("sym_key", encrypted_key.as_str()),
                ("token", encrypted_token.as_str()),
                ("mac", macs.as_str()),
            ],
        )?;
        let decoded = envelope::decode(&raw, Some(&candidate)).map_err(decode_failed)?;
        let response = classify(&decoded);

        if !response.is_error {
            let new_token = hex::decode(response.field(TOKEN_FIELD).ok_or(AuthError::MissingToken)?)?;
            self.session.adopt_key(candidate);
            tracing::info!("Authenticated");

            if self.tokens.save(&new_token).is_err() {
                tracing::warn!("Session established but the renewed token was not persisted");
            }
            return Ok(());
        }

        if response.code == ReturnCode::InvalidHost {
            self.register_host();
        }

        Err(AuthError::Rejected {
            code: response.code,
        })
    }

    /// Ask the server to register this host; fire-and-forget
    fn register_host(&self) {
        let hostname = host::hostname();
        tracing::info!("Host is unknown to the server, registering as {}", hostname);
        let postfix = append_query(REGISTER_ENDPOINT, "hostname", &hostname);
        self.notify_with_mac(&postfix, true);
    }
}
