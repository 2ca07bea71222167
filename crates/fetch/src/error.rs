//! Fetch Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A fetch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The transport could not complete the request.
    #[display("request to {_0} failed")]
    Request(#[error(not(source))] String),
    /// The HTTP client could not be configured.
    #[display("invalid HTTP client configuration: {_0}")]
    Client(#[error(not(source))] String),
    /// A local source could not be read.
    #[display("could not read {}", _0.display())]
    LocalRead(#[error(not(source))] PathBuf),
    /// Neither live content nor a cached copy exists for a source.
    #[display("source '{_0}' is unavailable: no live content and no cached copy")]
    SourceUnavailable(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::SourceUnavailable(_))
    }
}
