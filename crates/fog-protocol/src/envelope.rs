//! Response envelope
//!
//! The server may encrypt an entire reply body under the session key. An
//! encrypted body starts with one of two sentinels:
//!
//! - `#!en=` for an ordinary reply
//! - `#!enkey=` for the reply to the key exchange itself
//!
//! The remainder is `hex(iv)|hex(ciphertext)`, AES-256-CBC with zero padding.
//! A body with neither sentinel is plaintext and passes through untouched.

use aes::Aes256;
use cbc::cipher::{block_padding::ZeroPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::EnvelopeError;
use crate::key::SessionKey;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Sentinel for an ordinary encrypted reply
pub const ENCRYPTED_PREFIX: &str = "#!en=";

/// Sentinel for an encrypted key-exchange reply
pub const KEY_EXCHANGE_PREFIX: &str = "#!enkey=";

/// AES block / IV size
const IV_LEN: usize = 16;

/// Separator between IV and ciphertext
const IV_SEPARATOR: char = '|';

/// Kind of payload carried by a reply body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// No sentinel, the body is plaintext
    Plain,
    /// `#!en=` body encrypted under the session key
    Encrypted,
    /// `#!enkey=` handshake reply encrypted under the session key
    KeyExchange,
}

impl EnvelopeKind {
    /// Detect the envelope kind and return the payload with its sentinel removed
    pub fn detect(raw: &str) -> (Self, &str) {
        if let Some(rest) = raw.strip_prefix(KEY_EXCHANGE_PREFIX) {
            (Self::KeyExchange, rest)
        } else if let Some(rest) = raw.strip_prefix(ENCRYPTED_PREFIX) {
            (Self::Encrypted, rest)
        } else {
            (Self::Plain, raw)
        }
    }

    /// Sentinel string for this kind (empty for plaintext)
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Plain => "",
            Self::Encrypted => ENCRYPTED_PREFIX,
            Self::KeyExchange => KEY_EXCHANGE_PREFIX,
        }
    }
}

/// Open a reply body.
///
/// Plaintext bodies are returned unchanged whether or not a key is set.
/// An encrypted body with no key is [`EnvelopeError::MissingKey`].
pub fn decode(raw: &str, key: Option<&SessionKey>) -> Result<String, EnvelopeError> {
    let (kind, payload) = EnvelopeKind::detect(raw);
    if kind == EnvelopeKind::Plain {
        return Ok(raw.to_string());
    }

    let key = key.ok_or(EnvelopeError::MissingKey)?;
    tracing::debug!("Decrypting {:?} envelope ({} bytes)", kind, payload.len());
    decrypt(payload.trim(), key)
}

/// Seal a plaintext body the way the server does
pub fn encode(
    plaintext: &str,
    key: &SessionKey,
    kind: EnvelopeKind,
) -> Result<String, EnvelopeError> {
    if kind == EnvelopeKind::Plain {
        return Ok(plaintext.to_string());
    }

    let mut iv = [0u8; IV_LEN];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut iv);

    let cipher = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
        .map_err(|e| EnvelopeError::Cipher(e.to_string()))?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<ZeroPadding>(plaintext.as_bytes());

    Ok(format!(
        "{}{}{}{}",
        kind.prefix(),
        hex::encode(iv),
        IV_SEPARATOR,
        hex::encode(ciphertext)
    ))
}

fn decrypt(payload: &str, key: &SessionKey) -> Result<String, EnvelopeError> {
    let (iv_hex, data_hex) = payload
        .split_once(IV_SEPARATOR)
        .ok_or_else(|| EnvelopeError::Malformed("missing IV separator".to_string()))?;

    let iv = hex::decode(iv_hex.trim())?;
    if iv.len() != IV_LEN {
        return Err(EnvelopeError::Malformed(format!(
            "IV must be {} bytes, got {}",
            IV_LEN,
            iv.len()
        )));
    }
    let data = hex::decode(data_hex.trim())?;

    let cipher = Aes256CbcDec::new_from_slices(key.as_bytes(), &iv)
        .map_err(|e| EnvelopeError::Cipher(e.to_string()))?;
    let plaintext = cipher
        .decrypt_padded_vec_mut::<ZeroPadding>(&data)
        .map_err(|e| EnvelopeError::Cipher(e.to_string()))?;

    Ok(String::from_utf8(plaintext)?)
}
