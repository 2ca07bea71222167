//! Cache Error Types

use derive_more::{Display, Error};
use sofa_extract::models::Product;
use std::path::PathBuf;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A product's history could not be written back.
    #[display("could not persist history for {_0}")]
    HistoryWrite(#[error(not(source))] Product),
    /// A product's history file couldn't be read, so it can't be safely
    /// rewritten.
    #[display("history for {_0} is unreadable, not overwriting it")]
    HistoryUnreadable(#[error(not(source))] Product),
    /// The run marker file could not be written.
    #[display("could not write run markers to {}", _0.display())]
    MarkerWrite(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        true
    }
}
