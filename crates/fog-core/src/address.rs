//! Server address

use std::fmt;

/// Base URL of the FOG server: scheme, host and web root
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress(String);

impl ServerAddress {
    /// Wrap an already-built base URL
    pub fn new(base: impl Into<String>) -> Self {
        Self(base.into())
    }

    /// Get the base URL
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append a request postfix to the base URL.
    ///
    /// The postfix is concatenated as-is; both the web root and server
    /// postfixes conventionally carry their own slashes.
    pub fn join(&self, postfix: &str) -> String {
        format!("{}{}", self.0, postfix)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Append a query parameter, choosing `?` or `&` depending on whether the
/// target already has a query string.
pub fn append_query(target: &str, key: &str, value: &str) -> String {
    let separator = if target.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", target, separator, key, value)
}
