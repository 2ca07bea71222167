use std::collections::BTreeMap;

use exn::ResultExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use super::Normalizer;
use crate::error::{ErrorKind, Result};
use crate::models::{AssetCatalog, AssetRecord};

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "PublicAssetSets", default)]
    public_asset_sets: BTreeMap<String, Value>,
}

/// Reads the public asset sets of the release-metadata endpoint.
///
/// Records that don't look like builds are dropped one by one; a single odd
/// record never loses the rest of its platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseMetadataNormalizer;

impl Normalizer for ReleaseMetadataNormalizer {
    type Output = AssetCatalog;

    fn format(&self) -> &'static str {
        "release-metadata"
    }

    #[instrument(skip_all, fields(bytes = raw.len()))]
    fn normalize(&self, raw: &str) -> Result<AssetCatalog> {
        let envelope: Envelope =
            serde_json::from_str(raw).or_raise(|| ErrorKind::MalformedDocument(self.format()))?;
        let mut catalog = AssetCatalog::default();
        for (platform, records) in envelope.public_asset_sets {
            let Value::Array(records) = records else {
                tracing::debug!(%platform, "Skipping asset set that is not a list");
                continue;
            };
            let parsed = records
                .into_iter()
                .filter_map(|record| match serde_json::from_value::<AssetRecord>(record) {
                    Ok(record) if !record.product_version.is_empty() => Some(record),
                    Ok(_) => None,
                    Err(err) => {
                        tracing::debug!(%platform, error = %err, "Skipping unreadable asset record");
                        None
                    },
                })
                .collect();
            catalog.sets.insert(platform, parsed);
        }
        Ok(catalog)
    }
}
