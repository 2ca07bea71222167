use std::collections::BTreeMap;

use serde::Deserialize;

/// The published asset sets of the release-metadata endpoint, keyed by
/// platform name ("macOS", "iOS", and others the feed ignores).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetCatalog {
    pub sets: BTreeMap<String, Vec<AssetRecord>>,
}
impl AssetCatalog {
    pub fn records(&self, platform: &str) -> &[AssetRecord] {
        self.sets.get(platform).map(Vec::as_slice).unwrap_or_default()
    }
}

/// One build in an asset set, exactly as published.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AssetRecord {
    pub product_version: String,
    pub build: Option<String>,
    pub posting_date: Option<String>,
    pub expiration_date: Option<String>,
    pub supported_devices: Option<Vec<String>>,
}
