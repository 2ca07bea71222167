//! Normalization Error Types
//!
//! Upstream documents change shape without notice, so most of these end up
//! logged and degraded to an empty result by the caller rather than aborting
//! a run.

use derive_more::{Display, Error};

/// A normalization error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for normalization operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The document could not be parsed as the format it claims to be.
    #[display("malformed {_0} document")]
    MalformedDocument(#[error(not(source))] &'static str),
    /// A required field could not be found in the document.
    #[display("missing required field: {_0}")]
    MissingField(#[error(not(source))] &'static str),
    /// A field was found but could not be parsed.
    #[display("failed to parse field '{field}', found value: {value}")]
    ParseError {
        /// The field that failed to parse.
        field: &'static str,
        /// Details about the parsing failure.
        value: String,
    },
    /// A value could not be serialized for hashing or output.
    #[display("could not serialize value")]
    Serialization,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The same bytes will always normalize the same way; only a
        // different upstream response can change the outcome.
        false
    }
}
