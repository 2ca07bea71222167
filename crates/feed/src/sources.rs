use std::path::Path;

use sofa_config::{Config, Endpoint, ModelTable};
use sofa_fetch::{Location, Source, SourceFormat, url_source_id};

fn endpoint(id: &str, endpoint: &Endpoint, format: SourceFormat) -> Source {
    Source::new(id, Location::parse(&endpoint.url), format).required(endpoint.required)
}

pub(crate) fn release_metadata(config: &Config) -> Source {
    endpoint("gdmf", &config.sources.release_metadata, SourceFormat::Json)
}

pub(crate) fn security_index(config: &Config) -> Source {
    endpoint("security_index", &config.sources.security_index, SourceFormat::Html)
}

pub(crate) fn software_catalog(config: &Config) -> Source {
    endpoint("software_catalog", &config.sources.software_catalog, SourceFormat::Xml)
}

pub(crate) fn restore_images(config: &Config) -> Source {
    endpoint("restore_images", &config.sources.restore_images, SourceFormat::Xml)
}

pub(crate) fn supported_devices(location: &str) -> Source {
    Source::new("supported_devices", Location::parse(location), SourceFormat::Json)
}

pub(crate) fn model_table(table: &ModelTable) -> Source {
    Source::new(url_source_id(Path::new("models"), &table.source), Location::parse(&table.source), SourceFormat::Json)
}

pub(crate) fn bundle_manifest(url: &str) -> Source {
    Source::remote(url_source_id(Path::new("manifests"), url), url, SourceFormat::Xml)
}

pub(crate) fn advisory(url: &str) -> Source {
    Source::remote(url_source_id(Path::new("advisories"), url), url, SourceFormat::Html)
}
