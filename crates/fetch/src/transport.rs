use exn::ResultExt;
use reqwest::blocking::Client;

use crate::error::{ErrorKind, Result};

/// A completed HTTP exchange. Non-success statuses are still responses; it's
/// up to the caller to decide what they mean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}
impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Retrieves remote documents.
pub trait Transport: Send + Sync {
    /// Performs a GET request. Errors only when no response was received at
    /// all.
    fn get(&self, url: &str) -> Result<Response>;
}

/// Blocking HTTP transport.
pub struct HttpTransport {
    client: Client,
}
impl HttpTransport {
    /// Builds a client with the given user agent. `root_certificates` are
    /// extra PEM-encoded roots to trust, for endpoints served under a private
    /// CA (the release-metadata endpoint is).
    pub fn new(user_agent: &str, root_certificates: &[Vec<u8>]) -> Result<Self> {
        let mut builder = Client::builder().user_agent(user_agent);
        for pem in root_certificates {
            let certificate = reqwest::Certificate::from_pem(pem)
                .or_raise(|| ErrorKind::Client("root certificate is not valid PEM".to_string()))?;
            builder = builder.add_root_certificate(certificate);
        }
        let client = builder.build().or_raise(|| ErrorKind::Client("could not build HTTP client".to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    #[tracing::instrument(skip(self))]
    fn get(&self, url: &str) -> Result<Response> {
        let response = self.client.get(url).send().or_raise(|| ErrorKind::Request(url.to_string()))?;
        let status = response.status().as_u16();
        let body = response.text().or_raise(|| ErrorKind::Request(url.to_string()))?;
        tracing::debug!(status, bytes = body.len(), "Received response");
        Ok(Response { status, body })
    }
}
