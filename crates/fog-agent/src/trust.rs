//! Certificate trust
//!
//! The server's public certificate is downloaded before every
//! authentication attempt. It is only used to wrap the session key if it was
//! issued by the pinned CA, the one certificate authority this client is
//! configured to trust. System trust roots are never consulted.

use std::io::Cursor;
use std::path::Path;

use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use sha2::{Digest, Sha256};
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

use crate::error::TrustError;

const PEM_MARKER: &[u8] = b"-----BEGIN";

/// Read a certificate file in PEM or DER form and return its DER bytes
fn read_der(path: &Path) -> Result<Vec<u8>, TrustError> {
    let bytes = std::fs::read(path).map_err(|source| TrustError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    der_from_bytes(bytes)
}

/// Accept PEM (first certificate wins) or raw DER
fn der_from_bytes(bytes: Vec<u8>) -> Result<Vec<u8>, TrustError> {
    if !bytes.windows(PEM_MARKER.len()).any(|w| w == PEM_MARKER) {
        return Ok(bytes);
    }

    let mut reader = Cursor::new(bytes);
    let cert = rustls_pemfile::certs(&mut reader)
        .next()
        .ok_or(TrustError::EmptyPem)?
        .map_err(|e| TrustError::Parse(e.to_string()))?;
    Ok(cert.as_ref().to_vec())
}

fn parse(der: &[u8]) -> Result<X509Certificate<'_>, TrustError> {
    let (_, cert) =
        X509Certificate::from_der(der).map_err(|e| TrustError::Parse(e.to_string()))?;
    Ok(cert)
}

/// The pinned certificate authority
#[derive(Debug, Clone)]
pub struct PinnedCa {
    der: Vec<u8>,
}

impl PinnedCa {
    /// Load the CA certificate from a PEM or DER file
    pub fn from_file(path: &Path) -> Result<Self, TrustError> {
        Self::from_der(read_der(path)?)
    }

    /// Use an in-memory PEM or DER certificate
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, TrustError> {
        Self::from_der(der_from_bytes(bytes.into())?)
    }

    fn from_der(der: Vec<u8>) -> Result<Self, TrustError> {
        parse(&der)?;
        Ok(Self { der })
    }

    /// Subject of the CA, for logging
    pub fn subject(&self) -> String {
        parse(&self.der)
            .map(|cert| cert.subject().to_string())
            .unwrap_or_default()
    }
}

/// A certificate presented by the server
#[derive(Debug, Clone)]
pub struct ServerCertificate {
    der: Vec<u8>,
}

impl ServerCertificate {
    /// Load a downloaded certificate (PEM or DER)
    pub fn from_file(path: &Path) -> Result<Self, TrustError> {
        Self::from_bytes(read_der(path)?)
    }

    /// Use an in-memory PEM or DER certificate
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, TrustError> {
        let der = der_from_bytes(bytes.into())?;
        parse(&der)?;
        Ok(Self { der })
    }

    /// SHA-256 fingerprint of the DER encoding, lower-case hex
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.der))
    }

    /// Check that this certificate was issued by `ca` and is currently valid
    pub fn verify(&self, ca: &PinnedCa) -> Result<(), TrustError> {
        let cert = parse(&self.der)?;
        let ca_cert = parse(&ca.der)?;

        if cert.issuer().as_raw() != ca_cert.subject().as_raw() {
            return Err(TrustError::Untrusted(format!(
                "issuer '{}' is not '{}'",
                cert.issuer(),
                ca_cert.subject()
            )));
        }

        cert.verify_signature(Some(ca_cert.public_key()))
            .map_err(|e| TrustError::Untrusted(format!("signature check failed: {}", e)))?;

        if !cert.validity().is_valid() {
            return Err(TrustError::Expired);
        }

        Ok(())
    }

    /// RSA public key carried by the certificate
    pub fn public_key(&self) -> Result<RsaPublicKey, TrustError> {
        let cert = parse(&self.der)?;
        RsaPublicKey::from_public_key_der(cert.public_key().raw)
            .map_err(|e| TrustError::PublicKey(e.to_string()))
    }
}

/// Encrypt `data` to the certificate holder (RSA PKCS#1 v1.5)
pub fn encrypt(key: &RsaPublicKey, data: &[u8]) -> Result<Vec<u8>, TrustError> {
    key.encrypt(&mut rand::thread_rng(), Pkcs1v15Encrypt, data)
        .map_err(|e| TrustError::Encrypt(e.to_string()))
}
