//! Feed Error Types

use derive_more::{Display, Error};
use sofa_extract::models::Family;
use std::path::PathBuf;

/// A feed error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for feed operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A source the family can't do without has no live or cached content.
    #[display("required source '{_0}' is unavailable")]
    SourceUnavailable(#[error(not(source))] String),
    /// Storage or the HTTP client couldn't be prepared.
    #[display("could not set up the run: {_0}")]
    Setup(#[error(not(source))] String),
    /// The snapshot of a family couldn't be hashed.
    #[display("could not assemble the {_0} snapshot")]
    Snapshot(#[error(not(source))] Family),
    /// The syndication feed couldn't be rendered.
    #[display("could not render the syndication feed")]
    Template,
    /// A published artifact couldn't be written.
    #[display("could not write {}", _0.display())]
    Output(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SourceUnavailable(_) | Self::Output(_))
    }
}
