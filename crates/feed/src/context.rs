use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use exn::ResultExt;
use sofa_cache::{HistoryStore, RunMarkers};
use sofa_config::Config;
use sofa_extract::Normalizer;
use sofa_extract::normalize::{Advisory, AdvisoryNormalizer};
use sofa_fetch::{FetchOutcome, HttpTransport, ResilientFetcher, Source, Transport};
use sofa_storage::BackendHandle;
use sofa_storage::backend::{LocalBackend, ReadOnlyBackend};

use crate::aggregate::AdvisoryLookup;
use crate::error::{ErrorKind, Result};
use crate::sources;

/// Everything one run touches, built once per invocation.
///
/// Sources are fetched at most once per run: the outcome of every fetch is
/// kept, so families sharing a source (the release metadata, the security
/// index, advisories) see the same content.
pub struct RunContext {
    config: Config,
    cache: BackendHandle,
    output: BackendHandle,
    markers: BackendHandle,
    markers_file: PathBuf,
    fetcher: ResilientFetcher,
    documents: HashMap<String, FetchOutcome>,
    advisories: HashMap<String, Advisory>,
}
impl RunContext {
    /// A context on the local filesystem. With `dry_run`, nothing is written.
    pub fn new(config: Config, dry_run: bool) -> Result<Self> {
        let certificates = root_certificates(&config)?;
        let transport = HttpTransport::new(&config.user_agent, &certificates)
            .or_raise(|| ErrorKind::Setup("could not build the HTTP client".to_string()))?;

        let timestamp = config.timestamp_path();
        let markers_dir = match timestamp.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let markers_file = timestamp.file_name().map_or_else(|| PathBuf::from("timestamp.json"), PathBuf::from);

        let cache = local("cache", &config.cache_dir, dry_run)?;
        let output = local("output", &config.output_dir, dry_run)?;
        let markers = local("markers", &markers_dir, dry_run)?;
        Ok(Self::with_backends(config, Arc::new(transport), cache, output, markers, markers_file))
    }

    pub fn with_backends(
        config: Config,
        transport: Arc<dyn Transport>,
        cache: BackendHandle,
        output: BackendHandle,
        markers: BackendHandle,
        markers_file: impl Into<PathBuf>,
    ) -> Self {
        let fetcher = ResilientFetcher::new(transport, cache.clone(), config.provenance_capacity);
        Self {
            config,
            cache,
            output,
            markers,
            markers_file: markers_file.into(),
            fetcher,
            documents: HashMap::new(),
            advisories: HashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output(&self) -> &BackendHandle {
        &self.output
    }

    pub fn history(&self) -> HistoryStore {
        HistoryStore::new(self.cache.clone())
    }

    pub fn markers(&self) -> RunMarkers {
        RunMarkers::load(self.markers.as_ref(), &self.markers_file)
    }

    pub fn save_markers(&self, markers: &RunMarkers) -> Result<()> {
        markers.save(self.markers.as_ref()).or_raise(|| ErrorKind::Output(markers.path().to_path_buf()))
    }

    pub fn fetch(&mut self, source: &Source) -> FetchOutcome {
        if let Some(outcome) = self.documents.get(&source.id) {
            return outcome.clone();
        }
        let outcome = self.fetcher.fetch(source);
        self.documents.insert(source.id.clone(), outcome.clone());
        outcome
    }

    /// Content of a source, failing when it's required and unavailable.
    /// Optional sources that are unavailable give `None`.
    pub fn content(&mut self, source: &Source) -> Result<Option<String>> {
        let outcome = self.fetch(source);
        match source.required {
            true => outcome
                .require(source)
                .map(Some)
                .or_raise(|| ErrorKind::SourceUnavailable(source.id.clone())),
            false => Ok(outcome.into_content()),
        }
    }

    /// Normalized content of an optional source; empty when it's unavailable
    /// or malformed.
    pub fn normalized<N: Normalizer>(&mut self, source: &Source, normalizer: N) -> N::Output {
        match self.fetch(source).content() {
            Some(raw) => normalizer.normalize_lenient(raw),
            None => N::Output::default(),
        }
    }
}

impl AdvisoryLookup for RunContext {
    fn advisory(&mut self, url: &str) -> Advisory {
        if let Some(advisory) = self.advisories.get(url) {
            return advisory.clone();
        }
        let advisory = self.normalized(&sources::advisory(url), AdvisoryNormalizer);
        self.advisories.insert(url.to_string(), advisory.clone());
        advisory
    }
}

/// The extra roots the configured endpoints trust. A certificate file that
/// doesn't exist is skipped with a warning; its endpoint then falls back to
/// cached content.
fn root_certificates(config: &Config) -> Result<Vec<Vec<u8>>> {
    let mut certificates = Vec::new();
    for endpoint in config.sources.endpoints() {
        let Some(path) = &endpoint.root_certificate else {
            continue;
        };
        if !path.exists() {
            tracing::warn!(path = %path.display(), url = %endpoint.url, "Root certificate not found, using built-in roots");
            continue;
        }
        let pem = std::fs::read(path)
            .or_raise(|| ErrorKind::Setup(format!("could not read root certificate {}", path.display())))?;
        certificates.push(pem);
    }
    Ok(certificates)
}

fn local(name: &str, root: &Path, dry_run: bool) -> Result<BackendHandle> {
    let backend = LocalBackend::new(name, root)
        .or_raise(|| ErrorKind::Setup(format!("could not open {name} directory {}", root.display())))?;
    Ok(match dry_run {
        true => Arc::new(ReadOnlyBackend::new(Arc::new(backend))),
        false => Arc::new(backend),
    })
}
