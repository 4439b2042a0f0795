//! fog-protocol: Wire format for the FOG client protocol
//!
//! This crate defines the text protocol spoken between the client agent and
//! the FOG management server: the return codes that open every reply, the
//! `key=value` reply body, and the sentinel-prefixed envelope that marks a
//! body as encrypted under the session key.

pub mod code;
pub mod envelope;
pub mod error;
pub mod key;
pub mod response;

pub use code::ReturnCode;
pub use envelope::{EnvelopeKind, ENCRYPTED_PREFIX, KEY_EXCHANGE_PREFIX};
pub use error::EnvelopeError;
pub use key::{SessionKey, SESSION_KEY_LEN};
pub use response::{extract_array, parse, Response};

/// Query parameter identifying this client as a new-protocol service
pub const PROTOCOL_MARKER: (&str, &str) = ("newService", "1");
