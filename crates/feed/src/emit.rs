use std::path::PathBuf;

use exn::ResultExt;
use serde::Deserialize;
use sofa_extract::models::Family;
use sofa_storage::{StorageBackend, read_json, write_json};
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::snapshot::FeedSnapshot;

#[derive(Deserialize)]
struct Stamp {
    #[serde(rename = "UpdateHash")]
    update_hash: String,
}

/// `<family>_data_feed.json`
pub fn snapshot_path(family: Family) -> PathBuf {
    PathBuf::from(format!("{}_data_feed.json", family.slug()))
}

/// Writes a family's snapshot unless the published one already carries the
/// same hash. Returns whether anything was written.
#[instrument(skip_all, fields(family = %family, hash = %snapshot.update_hash))]
pub fn write_snapshot(output: &dyn StorageBackend, family: Family, snapshot: &FeedSnapshot) -> Result<bool> {
    let path = snapshot_path(family);
    match read_json::<Stamp>(output, &path) {
        Ok(Some(published)) if published.update_hash == snapshot.update_hash => {
            tracing::info!("Snapshot unchanged");
            return Ok(false);
        },
        Ok(_) => {},
        Err(err) => tracing::warn!(error = ?err, "Published snapshot is unreadable, replacing it"),
    }
    write_json(output, &path, snapshot).or_raise(|| ErrorKind::Output(path.clone()))?;
    tracing::info!(path = %path.display(), "Wrote snapshot");
    Ok(true)
}
