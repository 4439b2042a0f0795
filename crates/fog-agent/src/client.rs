//! The communicator: shared state for transport and authentication

use std::path::PathBuf;

use fog_core::config::{ClientConfig, ServerConfig};
use fog_core::{FixedMacProvider, MacProvider, SystemMacProvider, TokenStore, UserKeyProtector};

use crate::error::FogError;
use crate::http::{HttpBackend, ReqwestBackend};
use crate::session::SessionContext;
use crate::trust::PinnedCa;

/// Request behaviour settings
#[derive(Debug, Clone)]
pub struct CommOptions {
    /// Re-authentications a single GET may trigger on `#!ihc`
    pub max_auth_retries: u32,
    /// Where the server certificate is downloaded before authenticating
    pub server_cert_path: PathBuf,
}

impl CommOptions {
    /// Options taken from the client configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_auth_retries: config.max_auth_retries,
            server_cert_path: config.server_cert_path(),
        }
    }
}

/// Talks to the FOG server on behalf of the client service.
///
/// Request primitives live in `transport`, the key exchange in `auth`.
pub struct Communicator {
    pub(crate) http: Box<dyn HttpBackend>,
    pub(crate) session: SessionContext,
    pub(crate) tokens: TokenStore,
    pub(crate) ca: PinnedCa,
    pub(crate) macs: Box<dyn MacProvider>,
    pub(crate) options: CommOptions,
}

impl Communicator {
    /// Assemble a communicator from its parts.
    ///
    /// The server address starts unresolved; call
    /// [`Communicator::resolve_address`] before issuing requests.
    pub fn new(
        http: impl HttpBackend + 'static,
        tokens: TokenStore,
        ca: PinnedCa,
        options: CommOptions,
    ) -> Self {
        Self {
            http: Box::new(http),
            session: SessionContext::new(),
            tokens,
            ca,
            macs: Box::new(SystemMacProvider),
            options,
        }
    }

    /// Build a communicator from the client configuration.
    ///
    /// Loads the pinned CA and attempts to resolve the server address. An
    /// unresolvable address is logged but not fatal here; requests will
    /// fail with `CommError::AddressUnresolved` until it is fixed.
    pub fn from_config(config: &ClientConfig) -> Result<Self, FogError> {
        let http = ReqwestBackend::new(config.request_timeout).map_err(crate::CommError::from)?;
        let tokens = TokenStore::new(
            config.token_path.clone(),
            UserKeyProtector::new(config.token_key_path.clone()),
        );
        let ca = PinnedCa::from_file(&config.ca_cert_path)?;
        tracing::debug!("Pinned CA: {}", ca.subject());

        let mut communicator = Self::new(http, tokens, ca, CommOptions::from_config(config));
        if let Some(macs) = &config.mac_override {
            communicator = communicator.with_mac_provider(FixedMacProvider::new(macs.clone()));
        }
        communicator.resolve_address(&config.server);
        Ok(communicator)
    }

    /// Replace the MAC address source
    pub fn with_mac_provider(mut self, provider: impl MacProvider + 'static) -> Self {
        self.macs = Box::new(provider);
        self
    }

    /// (Re-)resolve the server address from configuration
    pub fn resolve_address(&self, server: &ServerConfig) -> bool {
        self.session.resolve_address(server)
    }

    /// Shared session state
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// The persisted token store
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// The host's MAC list as sent to the server
    pub fn mac_addresses(&self) -> String {
        self.macs.mac_addresses()
    }
}
