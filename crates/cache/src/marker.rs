use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use exn::ResultExt;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sofa_extract::models::Family;
use sofa_storage::{StorageBackend, read_json, write_json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{ErrorKind, Result};

/// When a family was last checked and what its snapshot hashed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RunMarker {
    #[serde(serialize_with = "time::serde::rfc3339::serialize", deserialize_with = "last_check")]
    pub last_check: OffsetDateTime,
    pub update_hash: String,
}

/// RFC 3339, also accepting the `+00:00Z` suffix older marker files carry.
fn last_check<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<OffsetDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    OffsetDateTime::parse(&raw, &Rfc3339)
        .or_else(|err| match raw.strip_suffix('Z').filter(|rest| rest.ends_with("+00:00")) {
            Some(rest) => OffsetDateTime::parse(rest, &Rfc3339),
            None => Err(err),
        })
        .map_err(serde::de::Error::custom)
}

/// The run marker file, keyed by family.
///
/// Entries that don't read as a marker (a family that has never run, an
/// unknown key) are kept as they are and written back untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMarkers {
    path: PathBuf,
    markers: BTreeMap<Family, RunMarker>,
    unread: BTreeMap<String, Value>,
}
impl RunMarkers {
    /// Reads the markers at `path`, one family at a time. A file that isn't a
    /// JSON object is treated as empty and replaced on the next save.
    pub fn load(backend: &dyn StorageBackend, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_json::<BTreeMap<String, Value>>(backend, &path) {
            Ok(entries) => entries.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = ?err, "Run markers are unreadable, starting over");
                BTreeMap::new()
            },
        };
        let mut markers = BTreeMap::new();
        let mut unread = BTreeMap::new();
        for (key, value) in entries {
            let Some(family) = key.parse::<Family>().ok().filter(|family| family.as_str() == key) else {
                unread.insert(key, value);
                continue;
            };
            match serde_json::from_value::<RunMarker>(value.clone()) {
                Ok(marker) => {
                    markers.insert(family, marker);
                },
                Err(err) => {
                    tracing::debug!(family = %family, error = %err, "Keeping unreadable run marker as is");
                    unread.insert(key, value);
                },
            }
        }
        Self { path, markers, unread }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, family: Family) -> Option<&RunMarker> {
        self.markers.get(&family)
    }

    pub fn record(&mut self, family: Family, update_hash: impl Into<String>, at: OffsetDateTime) {
        let last_check = at.replace_nanosecond(0).unwrap_or(at);
        self.unread.remove(family.as_str());
        self.markers.insert(family, RunMarker { last_check, update_hash: update_hash.into() });
    }

    pub fn save(&self, backend: &dyn StorageBackend) -> Result<()> {
        let mut entries = self.unread.clone();
        for (family, marker) in &self.markers {
            let value = serde_json::to_value(marker).or_raise(|| ErrorKind::MarkerWrite(self.path.clone()))?;
            entries.insert(family.as_str().to_string(), value);
        }
        write_json(backend, &self.path, &entries).or_raise(|| ErrorKind::MarkerWrite(self.path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use sofa_storage::backend::MockBackend;
    use time::macros::datetime;

    #[test]
    fn markers_merge_per_family() {
        let backend = MockBackend::with_files([(
            "timestamp.json",
            r#"{"iOS": {"LastCheck": "2024-03-01T00:00:00Z", "UpdateHash": "old"}}"#,
        )]);
        let mut markers = RunMarkers::load(&backend, "timestamp.json");
        markers.record(Family::MacOs, "abc", datetime!(2024-03-07 12:30:15.5 UTC));
        markers.save(&backend).unwrap();

        let json: serde_json::Value = serde_json::from_str(&backend.text("timestamp.json").unwrap()).unwrap();
        assert_eq!(json["iOS"]["UpdateHash"], "old");
        assert_eq!(json["macOS"]["LastCheck"], "2024-03-07T12:30:15Z");
        assert_eq!(json["macOS"]["UpdateHash"], "abc");
    }

    #[test]
    fn unreadable_markers_are_replaced() {
        let backend = MockBackend::with_files([("timestamp.json", "not json")]);
        let mut markers = RunMarkers::load(&backend, "timestamp.json");
        assert_eq!(markers.get(Family::Ios), None);
        markers.record(Family::Ios, "def", datetime!(2024-03-07 00:00 UTC));
        markers.save(&backend).unwrap();
        assert_eq!(RunMarkers::load(&backend, "timestamp.json").get(Family::Ios).unwrap().update_hash, "def");
    }

    #[rstest]
    #[case::python_isoformat("2024-03-07T12:30:15.123456+00:00Z")]
    #[case::offset("2024-03-07T12:30:15.123456+00:00")]
    #[case::zulu("2024-03-07T12:30:15.123456Z")]
    fn legacy_marker_files_are_read(#[case] last_check: &str) {
        let file = format!(r#"{{"macOS": {{}}, "iOS": {{"LastCheck": "{last_check}", "UpdateHash": "old"}}}}"#);
        let backend = MockBackend::with_files([("timestamp.json", file)]);
        let markers = RunMarkers::load(&backend, "timestamp.json");
        assert_eq!(markers.get(Family::MacOs), None);
        let ios = markers.get(Family::Ios).unwrap();
        assert_eq!(ios.update_hash, "old");
        assert_eq!(ios.last_check, datetime!(2024-03-07 12:30:15.123456 UTC));
    }

    #[test]
    fn entries_that_dont_read_are_written_back() {
        let backend = MockBackend::with_files([(
            "timestamp.json",
            r#"{"macOS": {}, "iOS": {"LastCheck": "yesterday", "UpdateHash": "old"}, "watchOS": {"UpdateHash": "w"}}"#,
        )]);
        let mut markers = RunMarkers::load(&backend, "timestamp.json");
        assert_eq!(markers.get(Family::Ios), None);
        markers.record(Family::MacOs, "abc", datetime!(2024-03-07 00:00 UTC));
        markers.save(&backend).unwrap();

        let json: serde_json::Value = serde_json::from_str(&backend.text("timestamp.json").unwrap()).unwrap();
        assert_eq!(json["macOS"]["UpdateHash"], "abc");
        assert_eq!(json["iOS"]["LastCheck"], "yesterday");
        assert_eq!(json["watchOS"]["UpdateHash"], "w");
    }
}
