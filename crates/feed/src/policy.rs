//! What sets the OS families apart.
//!
//! Everything family-specific is answered here, so the aggregator and the
//! pipeline never branch on a family themselves.

use sofa_extract::models::{AssetRecord, Family};

pub trait FamilyPolicy: Sync {
    fn family(&self) -> Family;

    /// The version prefix a configured release name selects, e.g. `14` for
    /// `Sonoma 14`.
    fn version_prefix<'a>(&self, name: &'a str) -> &'a str;

    /// Whether a release-metadata record belongs to this family at all.
    fn accepts(&self, record: &AssetRecord) -> bool;

    /// Whether the latest record of a release carries the security details
    /// of its newest security release.
    fn merges_latest_security(&self) -> bool;

    /// Whether the snapshot carries XProtect versions, device models and the
    /// restore image.
    fn includes_side_data(&self) -> bool;
}

/// macOS.
#[derive(Debug, Clone, Copy, Default)]
pub struct Desktop;

impl FamilyPolicy for Desktop {
    fn family(&self) -> Family {
        Family::MacOs
    }

    fn version_prefix<'a>(&self, name: &'a str) -> &'a str {
        name.split(' ').next_back().unwrap_or(name)
    }

    fn accepts(&self, _record: &AssetRecord) -> bool {
        true
    }

    fn merges_latest_security(&self) -> bool {
        true
    }

    fn includes_side_data(&self) -> bool {
        true
    }
}

/// iOS and iPadOS.
///
/// The mobile asset set also lists other platforms sharing version numbers,
/// so a record has to name an iPhone or iPad to count.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mobile;

impl FamilyPolicy for Mobile {
    fn family(&self) -> Family {
        Family::Ios
    }

    fn version_prefix<'a>(&self, name: &'a str) -> &'a str {
        name
    }

    fn accepts(&self, record: &AssetRecord) -> bool {
        record
            .supported_devices
            .iter()
            .flatten()
            .any(|device| device.starts_with("iPhone") || device.starts_with("iPad"))
    }

    fn merges_latest_security(&self) -> bool {
        false
    }

    fn includes_side_data(&self) -> bool {
        false
    }
}

pub fn policy_for(family: Family) -> &'static dyn FamilyPolicy {
    match family {
        Family::MacOs => &Desktop,
        Family::Ios => &Mobile,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Family::MacOs, "Sonoma 14", "14")]
    #[case(Family::MacOs, "15", "15")]
    #[case(Family::Ios, "17", "17")]
    #[case(Family::Ios, "17.4", "17.4")]
    fn prefixes(#[case] family: Family, #[case] name: &str, #[case] expected: &str) {
        assert_eq!(policy_for(family).version_prefix(name), expected);
    }

    #[rstest]
    #[case(Some(vec!["iPhone15,2"]), true)]
    #[case(Some(vec!["iPad13,1", "J421AP"]), true)]
    #[case(Some(vec!["AppleTV14,1"]), false)]
    #[case(None, false)]
    fn mobile_records_need_a_phone_or_tablet(#[case] devices: Option<Vec<&str>>, #[case] accepted: bool) {
        let record = AssetRecord {
            product_version: "17.4".to_string(),
            supported_devices: devices.map(|d| d.into_iter().map(String::from).collect()),
            ..AssetRecord::default()
        };
        assert_eq!(Mobile.accepts(&record), accepted);
        assert!(Desktop.accepts(&record));
    }
}
