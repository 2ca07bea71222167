//! In-memory storage backend for testing.

use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use crate::{FileInfo, StorageBackend};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use time::OffsetDateTime;

/// In-memory storage backend for testing.
///
/// Files are stored in a map behind a [`RwLock`], so all trait methods can
/// operate on `&self`. Successful writes are counted, which lets tests assert
/// that an unchanged run didn't touch storage.
///
/// # Examples
///
/// Only built with the `mock` feature.
///
/// ```
/// # #[cfg(feature = "mock")]
/// # fn main() {
/// use sofa_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// let backend = MockBackend::with_files([("gdmf_cached.json", "{}")]);
/// assert!(backend.exists(Path::new("gdmf_cached.json")).unwrap());
///
/// backend.write(Path::new("macOS_rss_data.json"), b"[]").unwrap();
/// assert_eq!(backend.writes(), 1);
/// # }
/// # #[cfg(not(feature = "mock"))]
/// # fn main() {}
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<BTreeMap<PathBuf, (OffsetDateTime, Vec<u8>)>>,
    writes: AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation. If test setup is wrong, then
    /// the test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = BTreeMap::new();
        let now = OffsetDateTime::now_utc();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, (now, data.into()));
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of successful writes since construction.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Contents of a file as text, for assertions.
    pub fn text(&self, path: impl AsRef<Path>) -> Option<String> {
        let path = validate_path(path).ok()?;
        let guard = self.storage.read().ok()?;
        guard.get(&path).map(|(_, data)| String::from_utf8_lossy(data).into_owned())
    }

    fn poisoned() -> ErrorKind {
        ErrorKind::BackendError("mock storage lock poisoned".to_string())
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        let prefix = prefix.map(validate_path).transpose()?;
        let guard = self.storage.read().map_err(|_| Self::poisoned())?;
        Ok(guard
            .iter()
            .filter(|(path, _)| prefix.as_ref().is_none_or(|pfx| path.starts_with(pfx)))
            .map(|(path, (inserted, data))| FileInfo::new(path.clone(), data.len() as u64, *inserted))
            .collect())
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.storage.read().map_err(|_| Self::poisoned())?.contains_key(&path))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        let guard = self.storage.read().map_err(|_| Self::poisoned())?;
        let (_inserted, data) = guard.get(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        Ok(data.clone())
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        self.storage
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(path, (OffsetDateTime::now_utc(), data.to_vec()));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
