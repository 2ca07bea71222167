use serde::{Deserialize, Serialize};

use super::{CveMap, Product, ReleaseDate, ReleaseKind, SecurityInfo, SecurityRelease};

/// One item of the persisted change feed.
///
/// Entries written before release kinds were tracked lack `ReleaseType`; they
/// are still read and still count towards deduplication through their bare
/// version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeFeedEntry {
    pub update_name: String,
    pub product_name: Product,
    pub product_version: String,
    pub release_date: ReleaseDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_type: Option<ReleaseKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_info: Option<SecurityInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_devices: Option<Vec<String>>,
    #[serde(rename = "CVEs", default, skip_serializing_if = "Option::is_none")]
    pub cves: Option<CveMap>,
    #[serde(rename = "ActivelyExploitedCVEs", default, skip_serializing_if = "Option::is_none")]
    pub actively_exploited_cves: Option<Vec<String>>,
    #[serde(rename = "UniqueCVEsCount", default, skip_serializing_if = "Option::is_none")]
    pub unique_cves_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_since_previous_release: Option<i64>,
}
impl ChangeFeedEntry {
    /// An XProtect component release, which carries no security details.
    pub fn component(kind: ReleaseKind, update_name: String, version: String, release_date: ReleaseDate) -> Self {
        Self {
            update_name,
            product_name: Product::XProtect,
            product_version: version,
            release_date,
            release_type: Some(kind),
            security_info: None,
            supported_devices: None,
            cves: None,
            actively_exploited_cves: None,
            unique_cves_count: None,
            days_since_previous_release: None,
        }
    }

    /// `<kind>_<version>` when the kind is known, otherwise the bare version.
    pub fn identity_key(&self) -> String {
        match self.release_type {
            Some(kind) => typed_key(kind, &self.product_version),
            None => self.product_version.clone(),
        }
    }

    /// The bare-version key entries carried before release kinds existed.
    pub fn legacy_key(&self) -> &str {
        &self.product_version
    }

    /// Stable identifier used for syndication.
    pub fn feed_id(&self) -> String {
        format!("{}_{}", self.product_name, self.identity_key())
    }

    pub fn exploited_count(&self) -> Option<usize> {
        self.cves.as_ref().map(|cves| cves.exploited().len())
    }
}
impl From<&SecurityRelease> for ChangeFeedEntry {
    fn from(release: &SecurityRelease) -> Self {
        let record = &release.record;
        let security = record.security.as_ref();
        Self {
            update_name: release.update_name.clone(),
            product_name: record.family.into(),
            product_version: record.product_version.clone(),
            release_date: record.release_date.clone(),
            release_type: Some(record.kind),
            security_info: security.map(|details| details.info.clone()),
            supported_devices: Some(record.supported_devices.clone()),
            cves: security.map(|details| details.cves.clone()),
            actively_exploited_cves: security.map(|details| details.actively_exploited.clone()),
            unique_cves_count: security.map(|details| details.unique_count),
            days_since_previous_release: Some(release.days_since_previous_release),
        }
    }
}

/// Identity key for a release of the given kind.
pub fn typed_key(kind: ReleaseKind, version: &str) -> String {
    format!("{kind}_{version}")
}
