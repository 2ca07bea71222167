//! Storage backend trait and implementations.
//!
//! Every artifact the feed persists (cached sources, provenance logs, feed
//! history, the published outputs) goes through a [`StorageBackend`], so the
//! whole pipeline can run against the local filesystem, a read-only view of
//! it, or memory.

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod ro;

pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
pub use self::ro::ReadOnlyBackend;
use crate::FileInfo;
use crate::error::Result;
use std::path::Path;

/// Unified interface for storage backends.
///
/// # Path Handling
/// All paths are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations should
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use sofa_storage::{backend::StorageBackend, error::Result};
///
/// fn cached_size(backend: &dyn StorageBackend) -> Result<u64> {
///     let path = Path::new("gdmf_cached.json");
///     if backend.exists(path)? {
///         Ok(backend.read(path)?.len() as u64)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
pub trait StorageBackend: Send + Sync {
    /// Name of the backend, for logging only.
    fn name(&self) -> &str;

    /// List all files, optionally only those under `prefix`.
    ///
    /// Listing a directory that doesn't exist gives an empty list rather
    /// than an error.
    fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>>;

    /// Check if a file exists.
    fn exists(&self, path: &Path) -> Result<bool>;

    /// Read the entire contents of a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write file contents, replacing any existing file.
    ///
    /// # Notes
    /// - Implementations should create parent directories as needed.
    /// - Readers must never observe a partially written file.
    fn write(&self, path: &Path, data: &[u8]) -> Result<()>;
}
