//! Blocking HTTP seam
//!
//! Transport talks to the server only through [`HttpBackend`], so request
//! logic can be driven by a scripted server in tests. [`ReqwestBackend`] is
//! the real implementation.

use std::io::Write;
use std::time::Duration;

use crate::error::HttpError;

/// Minimal blocking HTTP client used by the transport
pub trait HttpBackend: Send + Sync {
    /// GET `url` and return the body
    fn get(&self, url: &str) -> Result<Vec<u8>, HttpError>;

    /// POST `form` as `application/x-www-form-urlencoded` and return the body
    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Vec<u8>, HttpError>;

    /// GET `url`, streaming the body into `dest`; returns bytes written
    fn download(&self, url: &str, dest: &mut dyn Write) -> Result<u64, HttpError> {
        let body = self.get(url)?;
        dest.write_all(&body)?;
        Ok(body.len() as u64)
    }
}

/// [`HttpBackend`] over `reqwest::blocking`
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: reqwest::blocking::Client,
}

impl ReqwestBackend {
    /// Create a backend with the given per-request timeout
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fog-agent/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl HttpBackend for ReqwestBackend {
    fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }

    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Vec<u8>, HttpError> {
        let response = self
            .client
            .post(url)
            .form(form)
            .send()?
            .error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }

    fn download(&self, url: &str, dest: &mut dyn Write) -> Result<u64, HttpError> {
        let mut response = self.client.get(url).send()?.error_for_status()?;
        Ok(std::io::copy(&mut response, dest)?)
    }
}
