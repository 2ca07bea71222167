//! JSON documents on top of any backend.
//!
//! Everything the feed persists is JSON, written with four-space indentation
//! so diffs of the published files stay readable.

use exn::ResultExt;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::ser::{PrettyFormatter, Serializer};
use std::path::Path;

use crate::StorageBackend;
use crate::error::{ErrorKind, Result};

/// Reads and decodes a JSON document.
///
/// A missing file is `Ok(None)`; a file that exists but doesn't decode is
/// [`Corrupt`](ErrorKind::Corrupt).
pub fn read_json<T: DeserializeOwned>(backend: &dyn StorageBackend, path: &Path) -> Result<Option<T>> {
    let bytes = match backend.read(path) {
        Ok(bytes) => bytes,
        Err(err) if matches!(&*err, ErrorKind::NotFound(_)) => return Ok(None),
        Err(err) => return Err(err),
    };
    let value = serde_json::from_slice(&bytes).or_raise(|| ErrorKind::Corrupt(path.to_path_buf()))?;
    Ok(Some(value))
}

/// Encodes `value` as indented JSON and writes it.
pub fn write_json<T: Serialize + ?Sized>(backend: &dyn StorageBackend, path: &Path, value: &T) -> Result<()> {
    let mut buffer = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer).or_raise(|| ErrorKind::Encode(path.to_path_buf()))?;
    backend.write(path, &buffer)
}
