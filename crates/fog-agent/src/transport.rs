//! Request primitives
//!
//! Every request is blocking. Failures are logged where they happen and
//! returned as [`CommError`], so a caller can tell an unreachable server
//! apart from a reply the server flagged as an error (which is an `Ok`
//! [`Response`] with `is_error` set).

use std::fs;
use std::path::Path;

use fog_core::address::append_query;
use fog_core::ServerAddress;
use fog_protocol::{parse, EnvelopeError, Response, ReturnCode, PROTOCOL_MARKER};

use crate::client::Communicator;
use crate::error::CommError;

/// Tag the request as coming from the new client service
fn with_protocol_marker(postfix: &str) -> String {
    append_query(postfix, PROTOCOL_MARKER.0, PROTOCOL_MARKER.1)
}

/// Parse a decoded reply and log its return code
pub(crate) fn classify(decoded: &str) -> Response {
    let response = parse(decoded);
    response.code.log();
    response
}

pub(crate) fn decode_failed(e: EnvelopeError) -> CommError {
    tracing::error!("Could not decode reply: {}", e);
    CommError::from(e)
}

impl Communicator {
    fn address(&self) -> Result<ServerAddress, CommError> {
        self.session.address().ok_or_else(|| {
            tracing::error!("Server address is not set, refusing to send request");
            CommError::AddressUnresolved
        })
    }

    fn append_mac(&self, postfix: &str) -> String {
        append_query(postfix, "mac", &self.macs.mac_addresses())
    }

    /// GET a parsed reply.
    ///
    /// If the server answers "invalid host certificate", the client
    /// re-authenticates and repeats the request, at most `max_auth_retries`
    /// times before giving up with [`CommError::RetriesExhausted`].
    pub fn get(&self, postfix: &str) -> Result<Response, CommError> {
        let max = self.options.max_auth_retries;
        let mut attempts = 0;

        loop {
            let response = self.get_once(postfix)?;
            if response.code != ReturnCode::InvalidHostCertificate {
                return Ok(response);
            }

            if attempts >= max {
                tracing::error!(
                    "Server still rejects the host certificate after {} re-authentication attempt(s)",
                    attempts
                );
                return Err(CommError::RetriesExhausted { attempts });
            }
            attempts += 1;

            tracing::info!(
                "Server rejected the host certificate, re-authenticating ({}/{})",
                attempts,
                max
            );
            self.authenticate();
        }
    }

    /// GET a parsed reply, optionally identifying the host by MAC
    pub fn get_with_mac(&self, postfix: &str, append_mac: bool) -> Result<Response, CommError> {
        if append_mac {
            self.get(&self.append_mac(postfix))
        } else {
            self.get(postfix)
        }
    }

    fn get_once(&self, postfix: &str) -> Result<Response, CommError> {
        let raw = self.get_raw(postfix)?;
        let decoded = self.session.decode(&raw).map_err(decode_failed)?;
        Ok(classify(&decoded))
    }

    /// GET the reply body without decoding or parsing it
    pub fn get_raw(&self, postfix: &str) -> Result<String, CommError> {
        let url = self.address()?.join(&with_protocol_marker(postfix));
        tracing::info!("URL: {}", url);

        let body = self.http.get(&url).map_err(|e| {
            tracing::error!("Could not contact FOG server: {}", e);
            CommError::from(e)
        })?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// POST a form and parse the reply. Never retries.
    pub fn post(&self, postfix: &str, form: &[(&str, &str)]) -> Result<Response, CommError> {
        let raw = self.post_raw(postfix, form)?;
        let decoded = self.session.decode(&raw).map_err(decode_failed)?;
        Ok(classify(&decoded))
    }

    /// POST a form, returning the raw reply body
    pub(crate) fn post_raw(&self, postfix: &str, form: &[(&str, &str)]) -> Result<String, CommError> {
        let url = self.address()?.join(postfix);
        tracing::info!("POST URL: {}", url);

        let body = self.http.post_form(&url, form).map_err(|e| {
            tracing::error!("Failed to POST data: {}", e);
            CommError::from(e)
        })?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Download a file from the server to `dest`
    pub fn download_file(&self, postfix: &str, dest: &Path) -> Result<(), CommError> {
        let url = self.address()?.join(postfix);
        self.download_external_file(&url, dest)
    }

    /// Download a file from any URL to `dest`, creating parent directories.
    ///
    /// Succeeds only if the file exists once the transfer finishes.
    pub fn download_external_file(&self, url: &str, dest: &Path) -> Result<(), CommError> {
        tracing::info!("URL: {}", url);

        if url.is_empty() || dest.as_os_str().is_empty() {
            tracing::error!("Invalid parameters: url={:?} dest={:?}", url, dest);
            return Err(CommError::InvalidParameters(
                "url and destination must be non-empty".to_string(),
            ));
        }

        self.download_to(url, dest).map_err(|e| {
            tracing::error!("Could not download file: {}", e);
            e
        })
    }

    fn download_to(&self, url: &str, dest: &Path) -> Result<(), CommError> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(dest)?;
        let written = match self.http.download(url, &mut file) {
            Ok(written) => written,
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(dest);
                return Err(e.into());
            }
        };
        file.sync_all()?;
        tracing::debug!("Downloaded {} bytes to {:?}", written, dest);

        if !dest.exists() {
            return Err(CommError::MissingDownload(dest.to_path_buf()));
        }
        Ok(())
    }

    /// Tell the server something without reading the reply.
    ///
    /// Returns true if the request completed without a transport error.
    pub fn notify(&self, postfix: &str) -> bool {
        self.get_raw(postfix).is_ok()
    }

    /// [`Communicator::notify`], optionally identifying the host by MAC
    pub fn notify_with_mac(&self, postfix: &str, append_mac: bool) -> bool {
        if append_mac {
            self.notify(&self.append_mac(postfix))
        } else {
            self.notify(postfix)
        }
    }
}
