use std::collections::BTreeMap;

use exn::ResultExt;
use serde::Serialize;
use sofa_extract::content_hash;
use sofa_extract::models::{
    BundleVersions, ChangeFeedEntry, Family, ModelEntry, ModelInfo, ReleaseKind, ReleaseRecord, RestoreImage,
    SecurityRelease, SupportedDevicesEntry,
};

use crate::error::{ErrorKind, Result};

const CONFIG_BUNDLE: &str = "com.apple.XProtect";
const REMEDIATOR_BUNDLE: &str = "com.apple.XProtectFramework.XProtect";
// Apple spells this one with a lowercase "p".
const PLUGIN_SERVICE_BUNDLE: &str = "com.apple.XprotectFramework.PluginService";

/// One tracked release line of a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OsVersionEntry {
    #[serde(rename = "OSVersion")]
    pub os_version: String,
    #[serde(rename = "Latest")]
    pub latest: ReleaseRecord,
    #[serde(rename = "SecurityReleases")]
    pub security_releases: Vec<SecurityRelease>,
    #[serde(rename = "SupportedModels", skip_serializing_if = "Option::is_none")]
    pub supported_models: Option<Vec<ModelEntry>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallationApps {
    #[serde(rename = "LatestMacIPSW", skip_serializing_if = "Option::is_none")]
    pub latest_mac_ipsw: Option<RestoreImage>,
}

/// Everything a family publishes, without its hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotBody {
    #[serde(rename = "OSVersions")]
    pub os_versions: Vec<OsVersionEntry>,
    #[serde(rename = "XProtectPayloads", skip_serializing_if = "Option::is_none")]
    pub xprotect_payloads: Option<BundleVersions>,
    #[serde(rename = "XProtectPlistConfigData", skip_serializing_if = "Option::is_none")]
    pub xprotect_config: Option<BundleVersions>,
    #[serde(rename = "Models", skip_serializing_if = "Option::is_none")]
    pub models: Option<BTreeMap<String, ModelInfo>>,
    #[serde(rename = "InstallationApps", skip_serializing_if = "Option::is_none")]
    pub installation_apps: Option<InstallationApps>,
}
impl SnapshotBody {
    /// Gives records that list no devices the devices of their OS major
    /// version from `table`. When the table lists a major version more than
    /// once, the last entry wins.
    pub fn fill_supported_devices(&mut self, table: &[SupportedDevicesEntry]) {
        if table.is_empty() {
            return;
        }
        let records = self.os_versions.iter_mut().flat_map(|entry| {
            std::iter::once(&mut entry.latest).chain(entry.security_releases.iter_mut().map(|release| &mut release.record))
        });
        for record in records.filter(|record| record.supported_devices.is_empty()) {
            let major = record.product_version.split('.').next().unwrap_or_default();
            if let Some(entry) = table.iter().rev().find(|entry| entry.major() == major) {
                tracing::debug!(version = %record.product_version, devices = entry.supported_devices.len(), "Filled supported devices");
                record.supported_devices = entry.supported_devices.clone();
            }
        }
    }
}

/// A family's snapshot, stamped with the content hash of its body.
///
/// The hash is taken over the canonical JSON of the body, so it only
/// changes when the published data does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedSnapshot {
    #[serde(rename = "UpdateHash")]
    pub update_hash: String,
    #[serde(flatten)]
    pub body: SnapshotBody,
}
impl FeedSnapshot {
    pub fn stamp(family: Family, body: SnapshotBody) -> Result<Self> {
        let update_hash = content_hash(&body).or_raise(|| ErrorKind::Snapshot(family))?;
        Ok(Self { update_hash, body })
    }

    /// The change-feed candidates of this snapshot: every security release,
    /// then the XProtect components.
    pub fn change_feed_entries(&self) -> Vec<ChangeFeedEntry> {
        let mut entries: Vec<ChangeFeedEntry> = self
            .body
            .os_versions
            .iter()
            .flat_map(|entry| entry.security_releases.iter())
            .map(ChangeFeedEntry::from)
            .collect();
        if let Some(config) = &self.body.xprotect_config {
            entries.extend(component(config, CONFIG_BUNDLE, ReleaseKind::Config, "XProtect Plist Config"));
        }
        if let Some(payloads) = &self.body.xprotect_payloads {
            entries.extend(component(payloads, REMEDIATOR_BUNDLE, ReleaseKind::Remediator, "XProtect Remediator"));
            entries.extend(component(payloads, PLUGIN_SERVICE_BUNDLE, ReleaseKind::PluginService, "XProtect Plug-in Service"));
        }
        entries
    }
}

fn component(versions: &BundleVersions, bundle: &str, kind: ReleaseKind, label: &str) -> Option<ChangeFeedEntry> {
    let version = versions.version(bundle).filter(|v| !v.is_empty())?;
    let Some(date) = versions.release_date.clone() else {
        tracing::warn!(bundle, version, "XProtect component has no release date, leaving it out of the feed");
        return None;
    };
    Some(ChangeFeedEntry::component(kind, format!("{label} {version}"), version.to_string(), date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sofa_extract::models::{Product, ReleaseDate};

    fn record(version: &str, devices: &[&str]) -> ReleaseRecord {
        ReleaseRecord {
            family: Family::MacOs,
            product_version: version.to_string(),
            build: None,
            release_date: ReleaseDate::parse("2024-03-07"),
            expiration_date: None,
            supported_devices: devices.iter().map(|d| d.to_string()).collect(),
            kind: ReleaseKind::Os,
            security: None,
        }
    }

    fn body() -> SnapshotBody {
        SnapshotBody {
            os_versions: vec![OsVersionEntry {
                os_version: "Sonoma 14".to_string(),
                latest: record("14.4", &[]),
                security_releases: vec![SecurityRelease {
                    update_name: "macOS Sonoma 14.4".to_string(),
                    record: record("14.4", &["Mac-A"]),
                    days_since_previous_release: 24,
                }],
                supported_models: Some(Vec::new()),
            }],
            xprotect_payloads: Some(BundleVersions {
                bundles: BTreeMap::from([
                    (REMEDIATOR_BUNDLE.to_string(), "145".to_string()),
                    (PLUGIN_SERVICE_BUNDLE.to_string(), "72".to_string()),
                ]),
                release_date: Some(ReleaseDate::parse("2024-10-01")),
            }),
            xprotect_config: Some(BundleVersions {
                bundles: BTreeMap::from([(CONFIG_BUNDLE.to_string(), "5287".to_string())]),
                release_date: None,
            }),
            models: None,
            installation_apps: None,
        }
    }

    #[test]
    fn hash_is_stamped_first_and_deterministic() {
        let first = FeedSnapshot::stamp(Family::MacOs, body()).unwrap();
        let second = FeedSnapshot::stamp(Family::MacOs, body()).unwrap();
        assert_eq!(first.update_hash, second.update_hash);
        let json = serde_json::to_string(&first).unwrap();
        assert!(json.starts_with(&format!("{{\"UpdateHash\":\"{}\"", first.update_hash)));

        let mut changed = body();
        changed.os_versions[0].security_releases[0].days_since_previous_release = 25;
        assert_ne!(FeedSnapshot::stamp(Family::MacOs, changed).unwrap().update_hash, first.update_hash);
    }

    #[test]
    fn change_feed_includes_components_with_dates() {
        let snapshot = FeedSnapshot::stamp(Family::MacOs, body()).unwrap();
        let ids: Vec<_> = snapshot.change_feed_entries().iter().map(ChangeFeedEntry::feed_id).collect();
        // The config data has no release date, so it's left out.
        assert_eq!(ids, ["macOS_OS_14.4", "XProtect_Remediator_145", "XProtect_Plug-in_72"]);
        let entries = snapshot.change_feed_entries();
        assert_eq!(entries[1].product_name, Product::XProtect);
        assert_eq!(entries[2].update_name, "XProtect Plug-in Service 72");
    }

    #[test]
    fn empty_devices_are_filled_by_major_version() {
        let mut body = body();
        let table = [
            SupportedDevicesEntry { os_version: "14".to_string(), supported_devices: vec!["Old".to_string()] },
            SupportedDevicesEntry { os_version: "14.0".to_string(), supported_devices: vec!["Mac-Z".to_string()] },
            SupportedDevicesEntry { os_version: "13".to_string(), supported_devices: vec!["Mac-V".to_string()] },
        ];
        body.fill_supported_devices(&table);
        assert_eq!(body.os_versions[0].latest.supported_devices, ["Mac-Z"]);
        assert_eq!(body.os_versions[0].security_releases[0].record.supported_devices, ["Mac-A"]);
    }
}
