use serde::Serialize;

use super::{CveMap, Family, ReleaseDate, ReleaseKind, SecurityInfo};

/// The canonical form of one published OS build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReleaseRecord {
    #[serde(rename = "ProductName")]
    pub family: Family,
    pub product_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    pub release_date: ReleaseDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<ReleaseDate>,
    pub supported_devices: Vec<String>,
    #[serde(rename = "ReleaseType")]
    pub kind: ReleaseKind,
    #[serde(flatten)]
    pub security: Option<SecurityDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityDetails {
    #[serde(rename = "SecurityInfo")]
    pub info: SecurityInfo,
    #[serde(rename = "CVEs")]
    pub cves: CveMap,
    #[serde(rename = "ActivelyExploitedCVEs")]
    pub actively_exploited: Vec<String>,
    #[serde(rename = "UniqueCVEsCount")]
    pub unique_count: usize,
}
impl SecurityDetails {
    pub fn new(info: SecurityInfo, cves: CveMap) -> Self {
        Self {
            actively_exploited: cves.exploited(),
            unique_count: cves.len(),
            info,
            cves,
        }
    }
}

/// A release listed in the security index, with the details pulled from its
/// advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityRelease {
    pub update_name: String,
    #[serde(flatten)]
    pub record: ReleaseRecord,
    pub days_since_previous_release: i64,
}
