//! Session key

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of the session key in bytes (AES-256)
pub const SESSION_KEY_LEN: usize = 32;

/// Symmetric key negotiated with the server during authentication.
///
/// Held only in memory and wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SESSION_KEY_LEN]);

impl SessionKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; SESSION_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh random key
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_KEY_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}
