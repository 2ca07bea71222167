use std::collections::BTreeMap;

use exn::ResultExt;
use quick_xml::{Reader, events::Event};
use tracing::instrument;

use super::{Normalizer, plist};
use crate::error::{ErrorKind, Result};
use crate::models::ReleaseDate;

const BUNDLE_SUFFIX: &str = ".pkm";
const BUNDLE_MARKERS: [&str; 2] = ["XProtect", "PluginService"];

/// Products of the software update catalog, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoftwareCatalog {
    pub products: Vec<CatalogProduct>,
}
impl SoftwareCatalog {
    /// The first package manifest whose URL mentions `marker`, with the
    /// product that lists it.
    pub fn find_manifest(&self, marker: &str) -> Option<(&CatalogProduct, &str)> {
        self.products.iter().find_map(|product| {
            product
                .packages
                .iter()
                .flat_map(|package| [package.metadata_url.as_deref(), package.url.as_deref()])
                .flatten()
                .find(|url| url.starts_with("https") && url.contains(marker) && url.ends_with(BUNDLE_SUFFIX))
                .map(|url| (product, url))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogProduct {
    pub id: String,
    pub post_date: Option<ReleaseDate>,
    pub packages: Vec<CatalogPackage>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogPackage {
    pub url: Option<String>,
    pub metadata_url: Option<String>,
}

/// Reads the software update catalog property list.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogNormalizer;

impl Normalizer for CatalogNormalizer {
    type Output = SoftwareCatalog;

    fn format(&self) -> &'static str {
        "software-catalog"
    }

    #[instrument(skip_all, fields(bytes = raw.len()))]
    fn normalize(&self, raw: &str) -> Result<SoftwareCatalog> {
        let root = plist::parse(raw)?;
        let products = root
            .get("Products")
            .map(plist::PlistValue::as_dict)
            .unwrap_or_default()
            .iter()
            .map(|(id, product)| CatalogProduct {
                id: id.clone(),
                post_date: product.get("PostDate").and_then(plist::PlistValue::as_str).map(ReleaseDate::parse),
                packages: product
                    .get("Packages")
                    .map(plist::PlistValue::as_array)
                    .unwrap_or_default()
                    .iter()
                    .map(|package| CatalogPackage {
                        url: string_at(package, "URL"),
                        metadata_url: string_at(package, "MetadataURL"),
                    })
                    .collect(),
            })
            .collect::<Vec<_>>();
        tracing::debug!(products = products.len(), "Read software catalog");
        Ok(SoftwareCatalog { products })
    }
}

fn string_at(value: &plist::PlistValue, key: &str) -> Option<String> {
    value.get(key).and_then(plist::PlistValue::as_str).map(str::to_string)
}

/// Reads bundle versions out of an XProtect package manifest.
///
/// Only bundles belonging to XProtect (including its plug-in service) are
/// kept, keyed by bundle identifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleManifestNormalizer;

impl Normalizer for BundleManifestNormalizer {
    type Output = BTreeMap<String, String>;

    fn format(&self) -> &'static str {
        "bundle-manifest"
    }

    #[instrument(skip_all, fields(bytes = raw.len()))]
    fn normalize(&self, raw: &str) -> Result<BTreeMap<String, String>> {
        let mut reader = Reader::from_str(raw);
        let mut bundles = BTreeMap::new();
        let mut elements = 0usize;
        loop {
            match reader.read_event().or_raise(|| ErrorKind::MalformedDocument(self.format()))? {
                Event::Start(element) | Event::Empty(element) => {
                    elements += 1;
                    if element.name().as_ref() != b"bundle" {
                        continue;
                    }
                    let (mut id, mut version) = (None, None);
                    for attribute in element.attributes().flatten() {
                        let value = String::from_utf8_lossy(&attribute.value).into_owned();
                        match attribute.key.as_ref() {
                            b"id" => id = Some(value),
                            b"CFBundleShortVersionString" => version = Some(value),
                            _ => {},
                        }
                    }
                    match (id, version) {
                        (Some(id), Some(version)) if BUNDLE_MARKERS.iter().any(|m| id.contains(m)) => {
                            bundles.insert(id, version);
                        },
                        (Some(id), None) => tracing::debug!(%id, "Bundle has no short version string"),
                        _ => {},
                    }
                },
                Event::Eof => break,
                _ => {},
            }
        }
        if elements == 0 {
            exn::bail!(ErrorKind::MalformedDocument(self.format()));
        }
        Ok(bundles)
    }
}
