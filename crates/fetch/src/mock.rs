//! Scripted transport for testing.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{ErrorKind, Result};
use crate::transport::{Response, Transport};

/// Transport that answers from a table of canned responses.
///
/// URLs without a response, or explicitly marked as failing, behave like an
/// unreachable host. Every requested URL is recorded.
///
/// # Examples
///
/// Only built with the `mock` feature.
///
/// ```
/// # #[cfg(feature = "mock")]
/// # fn main() {
/// use sofa_fetch::{MockTransport, Transport};
///
/// let transport = MockTransport::default().respond("https://example.com/a.json", 200, "{}");
/// assert_eq!(transport.get("https://example.com/a.json").unwrap().body, "{}");
/// assert!(transport.get("https://example.com/missing").is_err());
/// assert_eq!(transport.requests().len(), 2);
/// # }
/// # #[cfg(not(feature = "mock"))]
/// # fn main() {}
/// ```
#[derive(Default)]
pub struct MockTransport {
    responses: RwLock<HashMap<String, Response>>,
    requests: RwLock<Vec<String>>,
}
impl MockTransport {
    pub fn respond(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.set(url, status, body);
        self
    }

    /// Replaces the response for `url`.
    pub fn set(&self, url: impl Into<String>, status: u16, body: impl Into<String>) {
        if let Ok(mut responses) = self.responses.write() {
            responses.insert(url.into(), Response { status, body: body.into() });
        }
    }

    /// Makes every URL unreachable from now on.
    pub fn fail_all(&self) {
        if let Ok(mut responses) = self.responses.write() {
            responses.clear();
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.read().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Transport for MockTransport {
    fn get(&self, url: &str) -> Result<Response> {
        if let Ok(mut requests) = self.requests.write() {
            requests.push(url.to_string());
        }
        let responses = self.responses.read().map_err(|_| ErrorKind::Request(url.to_string()))?;
        match responses.get(url) {
            Some(response) => Ok(response.clone()),
            None => exn::bail!(ErrorKind::Request(url.to_string())),
        }
    }
}
