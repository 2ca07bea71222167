//! Read-only storage backend.
//!
//! Wraps another backend and drops every mutation while reporting success,
//! which is what a dry run wants: the full pipeline executes, nothing on disk
//! changes.

use std::path::Path;

use crate::{BackendHandle, FileInfo, StorageBackend, error::Result};

/// Read-only storage backend.
///
/// Silently drops all write operations, logging an
/// [`info event`](tracing::Event).
#[derive(Clone)]
pub struct ReadOnlyBackend {
    inner: BackendHandle,
}
impl ReadOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.inner.list(prefix)
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        self.inner.exists(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read(path)
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        tracing::info!(backend = self.name(), path = %path.display(), bytes = data.len(), "Skipping write during read-only mode");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use std::sync::Arc;

    #[test]
    fn writes_are_dropped() {
        let inner = Arc::new(MockBackend::with_files([("kept.json", "old")]));
        let backend = ReadOnlyBackend::new(inner.clone());
        backend.write(Path::new("kept.json"), b"new").unwrap();
        backend.write(Path::new("added.json"), b"new").unwrap();
        assert_eq!(backend.read(Path::new("kept.json")).unwrap(), b"old");
        assert!(!backend.exists(Path::new("added.json")).unwrap());
        assert_eq!(inner.writes(), 0);
    }
}
