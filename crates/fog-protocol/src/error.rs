//! Protocol error types

use thiserror::Error;

/// Errors that can occur while opening or sealing an envelope
#[derive(Error, Debug)]
pub enum EnvelopeError {
    /// The body is encrypted but no session key has been negotiated
    #[error("Encrypted payload received but no session key is set")]
    MissingKey,

    /// The encrypted remainder is not `hex(iv)|hex(ciphertext)`
    #[error("Malformed envelope: {0}")]
    Malformed(String),

    /// Hex decoding of the IV or ciphertext failed
    #[error("Invalid hex in envelope: {0}")]
    Hex(#[from] hex::FromHexError),

    /// The cipher rejected the input (wrong key or corrupt data)
    #[error("Cipher failure: {0}")]
    Cipher(String),

    /// Plaintext was not valid UTF-8
    #[error("Decrypted payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
