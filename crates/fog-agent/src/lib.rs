//! fog-agent: Server communication for the FOG client service
//!
//! The client service talks to the FOG server over plain HTTP(S) requests.
//! Replies are line-oriented and may be wrapped in an AES envelope keyed by
//! a session key the client negotiates through an RSA key exchange. This
//! crate issues those requests, opens the envelopes, and re-authenticates
//! transparently when the server rejects the current session.

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod session;
pub mod transport;
pub mod trust;

pub use client::{CommOptions, Communicator};
pub use error::{AuthError, CommError, FogError, HttpError, TrustError};
pub use http::{HttpBackend, ReqwestBackend};
pub use session::SessionContext;
pub use trust::{PinnedCa, ServerCertificate};
