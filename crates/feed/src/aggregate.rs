//! Assembles the releases of one family from its normalized sources.

use std::collections::HashMap;

use sofa_extract::models::{
    AssetRecord, CveMap, ModelEntry, ReleaseDate, ReleaseKind, ReleaseRecord, SecurityDetails, SecurityInfo,
    SecurityRelease,
};
use sofa_extract::names::{product_version, rapid_response_letter, update_name};
use sofa_extract::normalize::{Advisory, IndexRow};
use sofa_fetch::resolve_link;
use tracing::instrument;

use crate::policy::FamilyPolicy;
use crate::snapshot::OsVersionEntry;

/// Resolves advisory pages to their security content.
pub trait AdvisoryLookup {
    fn advisory(&mut self, url: &str) -> Advisory;
}

/// Builds the releases of one family.
pub struct Aggregator<'a> {
    policy: &'a dyn FamilyPolicy,
    assets: &'a [AssetRecord],
    index: &'a [IndexRow],
    index_url: &'a str,
}
impl<'a> Aggregator<'a> {
    /// `assets` are the family's release-metadata records, `index` the rows
    /// of the security index page found at `index_url`.
    pub fn new(policy: &'a dyn FamilyPolicy, assets: &'a [AssetRecord], index: &'a [IndexRow], index_url: &'a str) -> Self {
        Self { policy, assets, index, index_url }
    }

    /// The most recently posted record whose version starts with `prefix`.
    ///
    /// Records posted on the same day keep upstream order: the first one
    /// wins. Records without a readable posting date rank below every dated
    /// one.
    pub fn latest(&self, prefix: &str) -> Option<&'a AssetRecord> {
        let mut latest: Option<(&AssetRecord, Option<time::Date>)> = None;
        for record in self.assets {
            if !record.product_version.starts_with(prefix) || !self.policy.accepts(record) {
                continue;
            }
            let posted = record.posting_date.as_deref().and_then(|date| ReleaseDate::parse(date).date());
            let newer = match latest {
                Some((_, best)) => posted > best,
                None => true,
            };
            if newer {
                latest = Some((record, posted));
            }
        }
        latest.map(|(record, _)| record)
    }

    /// Security releases listed in the index whose release name mentions
    /// `filter`, in page order.
    #[instrument(skip(self, lookup), fields(family = %self.policy.family()))]
    pub fn security_releases(&self, filter: &str, lookup: &mut dyn AdvisoryLookup) -> Vec<SecurityRelease> {
        let mut releases = Vec::new();
        for row in self.index {
            let name = update_name(&row.name);
            if name.is_empty() || !name.contains(filter) {
                continue;
            }
            let version = product_version(&row.name);
            let link = row.link.as_deref().map(|href| resolve_link(self.index_url, href));
            let cves = match &link {
                Some(url) => {
                    let advisory = lookup.advisory(url);
                    match advisory.no_published_entries {
                        true => CveMap::default(),
                        false => advisory.cves,
                    }
                },
                None => CveMap::default(),
            };
            let info = link.map_or(SecurityInfo::NoPublishedEntries, SecurityInfo::Advisory);
            let supported_devices = self
                .latest(&version)
                .and_then(|record| record.supported_devices.clone())
                .unwrap_or_default();
            tracing::debug!(update = %name, version = %version, cves = cves.len(), "Found security release");
            let kind = rapid_response_letter(&name).map_or(ReleaseKind::Os, ReleaseKind::RapidResponse);
            releases.push(SecurityRelease {
                update_name: name,
                record: ReleaseRecord {
                    family: self.policy.family(),
                    product_version: version,
                    build: None,
                    release_date: ReleaseDate::parse(&row.date),
                    expiration_date: None,
                    supported_devices,
                    kind,
                    security: Some(SecurityDetails::new(info, cves)),
                },
                days_since_previous_release: 0,
            });
        }

        let dates: Vec<_> = releases.iter().map(|release| release.record.release_date.clone()).collect();
        for (release, days) in releases.iter_mut().zip(days_since_previous(&dates)) {
            release.days_since_previous_release = days;
        }
        releases
    }

    /// Everything the snapshot lists for one configured release name, or
    /// `None` when the release metadata has no matching record.
    pub fn os_version(
        &self,
        name: &str,
        lookup: &mut dyn AdvisoryLookup,
        supported_models: Option<Vec<ModelEntry>>,
    ) -> Option<OsVersionEntry> {
        let Some(record) = self.latest(self.policy.version_prefix(name)) else {
            tracing::warn!(family = %self.policy.family(), release = name, "No release metadata matches");
            return None;
        };
        let mut latest = self.record(record);
        if self.policy.merges_latest_security()
            && let Some(newest) = self.security_releases(&latest.product_version, lookup).into_iter().next()
        {
            latest.security = newest.record.security;
        }
        Some(OsVersionEntry {
            os_version: name.to_string(),
            latest,
            security_releases: self.security_releases(name, lookup),
            supported_models,
        })
    }

    fn record(&self, record: &AssetRecord) -> ReleaseRecord {
        ReleaseRecord {
            family: self.policy.family(),
            product_version: record.product_version.clone(),
            build: record.build.clone(),
            release_date: ReleaseDate::parse(record.posting_date.as_deref().unwrap_or_default()),
            expiration_date: record.expiration_date.as_deref().filter(|d| !d.is_empty()).map(ReleaseDate::parse),
            supported_devices: record.supported_devices.clone().unwrap_or_default(),
            kind: ReleaseKind::Os,
            security: None,
        }
    }
}

/// Days between each release and the one listed after it, in the order
/// given, keyed by date: releases sharing a date all get the gap measured
/// from the last of them. A date with no readable gap after it gets zero.
pub fn days_since_previous(dates: &[ReleaseDate]) -> Vec<i64> {
    let mut gaps: HashMap<&ReleaseDate, i64> = HashMap::new();
    for pair in dates.windows(2) {
        if let Some(days) = pair[0].days_between(&pair[1]) {
            gaps.insert(&pair[0], days);
        }
    }
    dates.iter().map(|date| gaps.get(date).copied().unwrap_or(0)).collect()
}
