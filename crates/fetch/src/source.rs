use std::path::{Path, PathBuf};

use quick_xml::{Reader, events::Event};
use reqwest::Url;
use serde_json::Value;
use sofa_extract::{bytes_hash, value_hash};

/// Where a source's content comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    Remote(String),
    Local(PathBuf),
}
impl Location {
    /// `http(s)://` locations are remote, anything else is a local path.
    pub fn parse(raw: &str) -> Self {
        match raw.starts_with("https://") || raw.starts_with("http://") {
            true => Self::Remote(raw.to_string()),
            false => Self::Local(PathBuf::from(raw)),
        }
    }
}

/// The wire format of a source, deciding what counts as usable content and
/// how its identity is hashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Json,
    Xml,
    Html,
}
impl SourceFormat {
    /// Whether `raw` is worth keeping. Empty or unparseable payloads are
    /// treated as failed fetches so they never replace a good cached copy.
    pub fn validate(&self, raw: &str) -> bool {
        match self {
            SourceFormat::Json => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Null) => false,
                Ok(Value::Object(map)) => !map.is_empty(),
                Ok(Value::Array(items)) => !items.is_empty(),
                Ok(_) => true,
                Err(_) => false,
            },
            SourceFormat::Xml => well_formed_xml(raw),
            SourceFormat::Html => !raw.trim().is_empty(),
        }
    }

    /// Identity hash of a payload. JSON is hashed in canonical form so that
    /// key order never registers as a change.
    pub fn identity_hash(&self, raw: &str) -> String {
        match self {
            SourceFormat::Json => match serde_json::from_str::<Value>(raw) {
                Ok(value) => value_hash(value),
                Err(_) => bytes_hash(raw.as_bytes()),
            },
            SourceFormat::Xml | SourceFormat::Html => bytes_hash(raw.as_bytes()),
        }
    }
}

fn well_formed_xml(raw: &str) -> bool {
    let mut reader = Reader::from_str(raw);
    let mut depth = 0usize;
    let mut elements = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                depth += 1;
                elements += 1;
            },
            Ok(Event::Empty(_)) => elements += 1,
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => return elements > 0 && depth == 0,
            Ok(_) => {},
            Err(_) => return false,
        }
    }
}

/// One upstream document the feed depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Stable identifier, also the stem of the source's cache files.
    pub id: String,
    pub location: Location,
    pub format: SourceFormat,
    /// Whether the run can't proceed without this source.
    pub required: bool,
}
impl Source {
    pub fn new(id: impl Into<String>, location: Location, format: SourceFormat) -> Self {
        Self { id: id.into(), location, format, required: false }
    }

    pub fn remote(id: impl Into<String>, url: impl Into<String>, format: SourceFormat) -> Self {
        Self::new(id, Location::Remote(url.into()), format)
    }

    pub fn local(id: impl Into<String>, path: impl Into<PathBuf>, format: SourceFormat) -> Self {
        Self::new(id, Location::Local(path.into()), format)
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// `<id>_cached.json`: the last good content and its identity hash.
    pub fn cache_path(&self) -> PathBuf {
        PathBuf::from(format!("{}_cached.json", self.id))
    }

    /// `<id>_log.json`: the provenance log.
    pub fn log_path(&self) -> PathBuf {
        PathBuf::from(format!("{}_log.json", self.id))
    }

    pub fn describe(&self) -> String {
        match &self.location {
            Location::Remote(url) => url.clone(),
            Location::Local(path) => path.display().to_string(),
        }
    }
}

/// Resolves a link found in a page against the page's own URL. Links that
/// can't be resolved are returned unchanged.
pub fn resolve_link(base: &str, href: &str) -> String {
    Url::parse(base).and_then(|base| base.join(href)).map(String::from).unwrap_or_else(|_| href.to_string())
}

/// Stable identifier for a per-URL source, e.g. one advisory page.
pub fn url_source_id(prefix: &Path, url: &str) -> String {
    let digest = bytes_hash(url.as_bytes());
    prefix.join(&digest[..16]).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SourceFormat::Json, r#"{"PublicAssetSets": {}}"#, true)]
    #[case(SourceFormat::Json, "{}", false)]
    #[case(SourceFormat::Json, "[]", false)]
    #[case(SourceFormat::Json, "null", false)]
    #[case(SourceFormat::Json, "<html>", false)]
    #[case(SourceFormat::Xml, "<plist><dict/></plist>", true)]
    #[case(SourceFormat::Xml, "<plist><dict>", false)]
    #[case(SourceFormat::Xml, "", false)]
    #[case(SourceFormat::Html, "<html></html>", true)]
    #[case(SourceFormat::Html, "  \n", false)]
    fn payload_validation(#[case] format: SourceFormat, #[case] raw: &str, #[case] valid: bool) {
        assert_eq!(format.validate(raw), valid);
    }

    #[test]
    fn json_identity_ignores_key_order() {
        let a = SourceFormat::Json.identity_hash(r#"{"a": 1, "b": [1, 2]}"#);
        let b = SourceFormat::Json.identity_hash(r#"{"b":[1,2],"a":1}"#);
        assert_eq!(a, b);
        assert_ne!(SourceFormat::Html.identity_hash("<p>a</p>"), SourceFormat::Html.identity_hash("<p>b</p>"));
    }

    #[rstest]
    #[case("https://support.apple.com/en-us/100100", "/en-us/120895", "https://support.apple.com/en-us/120895")]
    #[case("https://support.apple.com/en-us/100100", "https://support.apple.com/kb/HT214084", "https://support.apple.com/kb/HT214084")]
    #[case("not a url", "/en-us/1", "/en-us/1")]
    fn links_resolve_against_page(#[case] base: &str, #[case] href: &str, #[case] expected: &str) {
        assert_eq!(resolve_link(base, href), expected);
    }

    #[test]
    fn location_parsing() {
        assert_eq!(Location::parse("https://gdmf.apple.com/v2/pmv"), Location::Remote("https://gdmf.apple.com/v2/pmv".into()));
        assert_eq!(Location::parse("data/models.json"), Location::Local(PathBuf::from("data/models.json")));
    }

    #[test]
    fn cache_file_names() {
        let source = Source::remote("gdmf", "https://gdmf.apple.com/v2/pmv", SourceFormat::Json);
        assert_eq!(source.cache_path(), PathBuf::from("gdmf_cached.json"));
        assert_eq!(source.log_path(), PathBuf::from("gdmf_log.json"));
        let id = url_source_id(Path::new("advisories"), "https://support.apple.com/en-us/120895");
        assert!(id.starts_with("advisories/"));
        assert_eq!(id.len(), "advisories/".len() + 16);
    }
}
