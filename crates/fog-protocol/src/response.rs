//! Reply parsing
//!
//! A reply body is newline-separated text. The first line is the return
//! code; every later line containing `=` is a `key=value` field, split on the
//! first `=` with both sides trimmed.

use base64::Engine;

use crate::code::ReturnCode;

/// Parsed server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// First line of the reply, trimmed
    pub return_code: String,
    /// Classified return code
    pub code: ReturnCode,
    /// True unless the return code is the success marker
    pub is_error: bool,
    /// Fields in the order their keys first appeared
    pub fields: Vec<(String, String)>,
}

impl Default for Response {
    /// An empty reply: no code, no fields, flagged as an error
    fn default() -> Self {
        Self {
            return_code: String::new(),
            code: ReturnCode::Unknown(String::new()),
            is_error: true,
            fields: Vec::new(),
        }
    }
}

impl Response {
    /// Look up a field by exact key
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Human-readable description of the return code
    pub fn description(&self) -> Option<&'static str> {
        self.code.description()
    }

    /// Whether the reply carried no return code at all
    pub fn is_empty(&self) -> bool {
        self.return_code.is_empty() && self.fields.is_empty()
    }

    /// Insert a field; a repeated key replaces the earlier value in place
    fn insert(&mut self, key: String, value: String) {
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => {
                tracing::debug!("Duplicate field '{}' in reply, keeping last value", key);
                entry.1 = value;
            }
            None => self.fields.push((key, value)),
        }
    }
}

/// Parse a raw (already decrypted) reply body
pub fn parse(raw: &str) -> Response {
    let mut lines = raw.split('\n');
    let first = lines.next().unwrap_or_default().trim();
    let code = ReturnCode::parse(first);

    let mut response = Response {
        return_code: first.to_string(),
        is_error: !code.is_success(),
        code,
        fields: Vec::new(),
    };

    for line in lines {
        if let Some((key, value)) = line.split_once('=') {
            response.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    response
}

/// Collect every field whose key contains `identifier`, in field order.
///
/// With `decode_base64`, each value is base64-decoded; a value that fails to
/// decode is logged and yields an empty entry.
pub fn extract_array(response: &Response, identifier: &str, decode_base64: bool) -> Vec<String> {
    response
        .fields
        .iter()
        .filter(|(key, _)| key.contains(identifier))
        .map(|(key, value)| {
            if decode_base64 {
                decode_field(key, value)
            } else {
                value.clone()
            }
        })
        .collect()
}

fn decode_field(key: &str, value: &str) -> String {
    let bytes = match base64::engine::general_purpose::STANDARD.decode(value) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Could not base64 decode field '{}': {}", key, e);
            return String::new();
        }
    };
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("Decoded field '{}' is not UTF-8: {}", key, e);
            String::new()
        }
    }
}
