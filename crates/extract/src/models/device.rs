use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One row of a hand-maintained model table for an OS generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "URL", default)]
    pub url: String,
    /// Marketing name keyed by model identifier.
    #[serde(rename = "Identifiers", default)]
    pub identifiers: BTreeMap<String, String>,
}

/// Which OS generations a model identifier supports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    #[serde(rename = "MarketingName")]
    pub marketing_name: String,
    #[serde(rename = "SupportedOS")]
    pub supported_os: Vec<String>,
    #[serde(rename = "OSVersions")]
    pub os_versions: Vec<u32>,
}

/// Devices supported by an OS version, from the local fallback table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedDevicesEntry {
    #[serde(rename = "OSVersion")]
    pub os_version: String,
    #[serde(rename = "SupportedDevices", default)]
    pub supported_devices: Vec<String>,
}
impl SupportedDevicesEntry {
    pub fn major(&self) -> &str {
        self.os_version.split('.').next().unwrap_or_default()
    }
}
