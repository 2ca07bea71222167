use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// CVE identifiers mapped to whether Apple flagged them as actively
/// exploited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CveMap(BTreeMap<String, bool>);
impl CveMap {
    /// Records a CVE the first time it is seen. Later sightings never change
    /// the classification.
    pub fn insert_first(&mut self, cve: impl Into<String>, exploited: bool) -> bool {
        let mut inserted = false;
        self.0.entry(cve.into()).or_insert_with(|| {
            inserted = true;
            exploited
        });
        inserted
    }

    pub fn contains(&self, cve: &str) -> bool {
        self.0.contains_key(cve)
    }

    pub fn is_exploited(&self, cve: &str) -> Option<bool> {
        self.0.get(cve).copied()
    }

    pub fn exploited(&self) -> Vec<String> {
        self.0.iter().filter(|(_, exploited)| **exploited).map(|(cve, _)| cve.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl FromIterator<(String, bool)> for CveMap {
    fn from_iter<T: IntoIterator<Item = (String, bool)>>(iter: T) -> Self {
        let mut map = Self::default();
        for (cve, exploited) in iter {
            map.insert_first(cve, exploited);
        }
        map
    }
}

/// Where the security content of a release is documented.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SecurityInfo {
    Advisory(String),
    NoPublishedEntries,
}
impl SecurityInfo {
    pub const NO_PUBLISHED_ENTRIES: &'static str = "This update has no published CVE entries.";

    pub fn as_str(&self) -> &str {
        match self {
            SecurityInfo::Advisory(url) => url,
            SecurityInfo::NoPublishedEntries => Self::NO_PUBLISHED_ENTRIES,
        }
    }

    pub fn advisory_url(&self) -> Option<&str> {
        match self {
            SecurityInfo::Advisory(url) => Some(url),
            SecurityInfo::NoPublishedEntries => None,
        }
    }
}
impl Serialize for SecurityInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
impl<'de> Deserialize<'de> for SecurityInfo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            Self::NO_PUBLISHED_ENTRIES => Self::NoPublishedEntries,
            _ => Self::Advisory(raw),
        })
    }
}
