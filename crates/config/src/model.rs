use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sofa_extract::models::Family;

/// Everything a run needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source caches, provenance logs and the change history.
    pub cache_dir: PathBuf,
    /// Snapshots and the syndication feed.
    pub output_dir: PathBuf,
    /// Run marker file; defaults to `timestamp.json` in the output directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_file: Option<PathBuf>,
    /// Fetch attempts kept per source.
    pub provenance_capacity: usize,
    pub user_agent: String,
    pub sources: Sources,
    /// Left out of the serialized defaults so the legacy `softwareReleases`
    /// key never collides with them.
    #[serde(alias = "softwareReleases", skip_serializing)]
    pub software_releases: Vec<SoftwareRelease>,
    /// Device tables per macOS generation, newest first.
    pub model_tables: Vec<ModelTable>,
    /// Fallback device lists per OS major version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_devices: Option<String>,
    pub feed: FeedMetadata,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            output_dir: PathBuf::from("."),
            timestamp_file: None,
            provenance_capacity: 10,
            user_agent: format!("sofa/{}", env!("CARGO_PKG_VERSION")),
            sources: Sources::default(),
            software_releases: vec![
                SoftwareRelease::new(Family::MacOs, "Sequoia 15"),
                SoftwareRelease::new(Family::MacOs, "Sonoma 14"),
                SoftwareRelease::new(Family::MacOs, "Ventura 13"),
                SoftwareRelease::new(Family::Ios, "18"),
                SoftwareRelease::new(Family::Ios, "17"),
            ],
            model_tables: vec![
                ModelTable::new("macOS Sonoma 14", "model_identifier_sonoma.json"),
                ModelTable::new("macOS Ventura 13", "model_identifier_ventura.json"),
                ModelTable::new("macOS Monterey 12", "model_identifier_monterey.json"),
            ],
            supported_devices: Some("cache/supported_devices.json".to_string()),
            feed: FeedMetadata::default(),
        }
    }
}

/// Apple Root CA, which the release-metadata endpoint chains to and the
/// bundled web roots don't include.
pub const DEFAULT_ROOT_CERTIFICATE: &str = "AppleRoot.pem";

/// Upstream endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sources {
    pub release_metadata: Endpoint,
    pub security_index: Endpoint,
    pub software_catalog: Endpoint,
    pub restore_images: Endpoint,
}
impl Default for Sources {
    fn default() -> Self {
        Self {
            release_metadata: Endpoint::new("https://gdmf.apple.com/v2/pmv", true)
                .with_root_certificate(DEFAULT_ROOT_CERTIFICATE),
            security_index: Endpoint::new("https://support.apple.com/en-us/HT201222", true),
            software_catalog: Endpoint::new(
                "https://swscan.apple.com/content/catalogs/others/index-14-13-12-10.16-10.15-10.14-10.13-10.12-10.11-10.10-10.9-mountainlion-lion-snowleopard-leopard.merged-1.sucatalog",
                false,
            ),
            restore_images: Endpoint::new(
                "https://mesu.apple.com/assets/macos/com_apple_macOSIPSW/com_apple_macOSIPSW.xml",
                false,
            ),
        }
    }
}

impl Sources {
    pub fn endpoints(&self) -> [&Endpoint; 4] {
        [&self.release_metadata, &self.security_index, &self.software_catalog, &self.restore_images]
    }

    /// Anchors relative certificate paths at `dir`.
    pub(crate) fn resolve_relative_to(&mut self, dir: &Path) {
        for endpoint in
            [&mut self.release_metadata, &mut self.security_index, &mut self.software_catalog, &mut self.restore_images]
        {
            if let Some(path) = endpoint.root_certificate.as_mut()
                && path.is_relative()
            {
                *path = dir.join(&*path);
            }
        }
    }
}

/// One upstream endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    /// Whether a family's run fails when neither live nor cached content
    /// exists.
    #[serde(default)]
    pub required: bool,
    /// Extra PEM root certificate to trust. Relative paths are resolved
    /// against the configuration file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_certificate: Option<PathBuf>,
}
impl Endpoint {
    pub fn new(url: impl Into<String>, required: bool) -> Self {
        Self { url: url.into(), required, root_certificate: None }
    }

    pub fn with_root_certificate(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_certificate = Some(path.into());
        self
    }
}

/// A release line to track, like `Sonoma 14` for macOS or `17` for iOS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareRelease {
    #[serde(alias = "osType")]
    pub os_type: Family,
    pub name: String,
}
impl SoftwareRelease {
    pub fn new(os_type: Family, name: impl Into<String>) -> Self {
        Self { os_type, name: name.into() }
    }
}

/// A device table for one OS generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTable {
    /// Marketing label of the generation, e.g. `macOS Sonoma 14`.
    pub label: String,
    /// Local path or URL of the table.
    pub source: String,
}
impl ModelTable {
    pub fn new(label: impl Into<String>, source: impl Into<String>) -> Self {
        Self { label: label.into(), source: source.into() }
    }
}

/// Channel metadata of the syndication feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedMetadata {
    pub title: String,
    pub description: String,
    pub link: String,
    pub self_link: String,
    pub logo: String,
    pub language: String,
    pub file_name: String,
}
impl Default for FeedMetadata {
    fn default() -> Self {
        Self {
            title: "SOFA - RSS Update Feed".to_string(),
            description: "This feed includes updates on OS versions and security info.".to_string(),
            link: "https://sofa.macadmins.io".to_string(),
            self_link: "https://sofa.macadmins.io/v1/rss_feed.xml".to_string(),
            logo: "https://sofa.macadmins.io/images/custom_logo.png".to_string(),
            language: "en".to_string(),
            file_name: "rss_feed.xml".to_string(),
        }
    }
}
