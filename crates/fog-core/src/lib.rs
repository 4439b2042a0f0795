//! fog-core: Configuration, address resolution and persisted state for the FOG client
//!
//! This crate holds everything the communication layer needs besides the
//! wire format itself: the server configuration and the address derived from
//! it, the protected security-token store, and the host identity (MAC
//! addresses and hostname) sent along with requests.

pub mod address;
pub mod config;
pub mod error;
pub mod host;
pub mod token;

pub use address::ServerAddress;
pub use error::{ConfigError, TokenError};
pub use host::{FixedMacProvider, MacProvider, SystemMacProvider};
pub use token::{TokenProtector, TokenStore, UserKeyProtector};
