//! Session context
//!
//! The server address and the negotiated session key are shared by every
//! request. Both live here behind locks, so a request never reads a
//! half-rotated key while an authentication is swapping it.

use parking_lot::{Mutex, RwLock};

use fog_core::config::ServerConfig;
use fog_core::ServerAddress;
use fog_protocol::{envelope, EnvelopeError, SessionKey};

/// Address and credentials for the current server session
#[derive(Debug, Default)]
pub struct SessionContext {
    address: RwLock<Option<ServerAddress>>,
    key: Mutex<Option<SessionKey>>,
}

impl SessionContext {
    /// Create an empty context (no address, no key)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with a known address
    pub fn with_address(address: ServerAddress) -> Self {
        Self {
            address: RwLock::new(Some(address)),
            key: Mutex::new(None),
        }
    }

    /// Resolve the server address from configuration and store it.
    ///
    /// On failure the stored address is cleared, so no request can go out
    /// against a stale server.
    pub fn resolve_address(&self, server: &ServerConfig) -> bool {
        match server.resolve() {
            Ok(address) => {
                tracing::debug!("Server address set to {}", address);
                *self.address.write() = Some(address);
                true
            }
            Err(e) => {
                tracing::error!("Invalid parameters: {}", e);
                *self.address.write() = None;
                false
            }
        }
    }

    /// Current server address, if resolved
    pub fn address(&self) -> Option<ServerAddress> {
        self.address.read().clone()
    }

    /// Whether a session key has been negotiated
    pub fn has_key(&self) -> bool {
        self.key.lock().is_some()
    }

    /// Replace the session key, dropping (and wiping) the previous one
    pub fn adopt_key(&self, key: SessionKey) {
        *self.key.lock() = Some(key);
    }

    /// Forget the session key
    pub fn clear_key(&self) {
        self.key.lock().take();
    }

    /// Open a reply envelope with the current session key
    pub fn decode(&self, raw: &str) -> Result<String, EnvelopeError> {
        let key = self.key.lock();
        envelope::decode(raw, key.as_ref())
    }
}
