use std::collections::BTreeMap;

use serde::Serialize;

use super::ReleaseDate;

/// Bundle versions from an XProtect package manifest, dated by the catalog
/// product that shipped it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BundleVersions {
    #[serde(flatten)]
    pub bundles: BTreeMap<String, String>,
    #[serde(rename = "ReleaseDate", skip_serializing_if = "Option::is_none")]
    pub release_date: Option<ReleaseDate>,
}
impl BundleVersions {
    pub fn version(&self, bundle_id: &str) -> Option<&str> {
        self.bundles.get(bundle_id).map(String::as_str)
    }
}

/// The most widely offered restore image for the desktop family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreImage {
    #[serde(rename = "macos_ipsw_url")]
    pub url: String,
    #[serde(rename = "macos_ipsw_build")]
    pub build: String,
    #[serde(rename = "macos_ipsw_version")]
    pub version: String,
    #[serde(rename = "macos_ipsw_apple_slug")]
    pub apple_slug: Option<String>,
}
