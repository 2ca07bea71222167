use std::sync::Arc;

use exn::ResultExt;
use serde::{Deserialize, Serialize};
use sofa_storage::{BackendHandle, read_json, write_json};
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::provenance::{Outcome, ProvenanceEntry, ProvenanceLog};
use crate::source::{Location, Source};
use crate::transport::Transport;

/// The last good content of a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub identity_hash: String,
    pub content: String,
}

/// What a fetch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Live content; `changed` is false when it matches the cached copy.
    Fresh { content: String, identity_hash: String, changed: bool },
    /// The live fetch failed and the cached copy was used instead.
    Fallback { content: String, identity_hash: String },
    /// No live content and nothing cached.
    Unavailable,
}
impl FetchOutcome {
    pub fn content(&self) -> Option<&str> {
        match self {
            FetchOutcome::Fresh { content, .. } | FetchOutcome::Fallback { content, .. } => Some(content),
            FetchOutcome::Unavailable => None,
        }
    }

    pub fn into_content(self) -> Option<String> {
        match self {
            FetchOutcome::Fresh { content, .. } | FetchOutcome::Fallback { content, .. } => Some(content),
            FetchOutcome::Unavailable => None,
        }
    }

    pub fn identity_hash(&self) -> Option<&str> {
        match self {
            FetchOutcome::Fresh { identity_hash, .. } | FetchOutcome::Fallback { identity_hash, .. } => Some(identity_hash),
            FetchOutcome::Unavailable => None,
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            FetchOutcome::Fresh { .. } => Outcome::Success,
            FetchOutcome::Fallback { .. } => Outcome::FallbackToCache,
            FetchOutcome::Unavailable => Outcome::TotalFailure,
        }
    }

    /// Content of a source the caller can't do without.
    pub fn require(self, source: &Source) -> Result<String> {
        match self.into_content() {
            Some(content) => Ok(content),
            None => exn::bail!(ErrorKind::SourceUnavailable(source.id.clone())),
        }
    }
}

struct Retrieved {
    status: Option<u16>,
    success: bool,
    body: String,
}

/// Fetches sources, falling back to the cache when the live copy is
/// unusable.
///
/// Cache and provenance I/O failures are logged and never turn a successful
/// fetch into a failed one.
pub struct ResilientFetcher {
    transport: Arc<dyn Transport>,
    cache: BackendHandle,
    log_capacity: usize,
}
impl ResilientFetcher {
    pub fn new(transport: Arc<dyn Transport>, cache: BackendHandle, log_capacity: usize) -> Self {
        Self { transport, cache, log_capacity }
    }

    #[instrument(skip(self, source), fields(source = %source.id))]
    pub fn fetch(&self, source: &Source) -> FetchOutcome {
        let cached = self.load_cache(source);
        let outcome = match self.retrieve(source) {
            Ok(retrieved) if retrieved.success && source.format.validate(&retrieved.body) => {
                self.accept(source, cached.as_ref(), retrieved)
            },
            Ok(retrieved) => {
                tracing::warn!(status = ?retrieved.status, location = %source.describe(), "Unusable response");
                self.fall_back(source, cached, retrieved.status)
            },
            Err(err) => {
                tracing::warn!(location = %source.describe(), error = ?err, "Fetch failed");
                self.fall_back(source, cached, None)
            },
        };
        tracing::info!(outcome = ?outcome.outcome(), "Fetched source");
        outcome
    }

    /// The cached copy of a source, if one exists and is readable.
    pub fn cached(&self, source: &Source) -> Option<CacheEntry> {
        self.load_cache(source)
    }

    /// The provenance log of a source.
    pub fn log(&self, source: &Source) -> ProvenanceLog {
        let entries = match read_json::<Vec<ProvenanceEntry>>(self.cache.as_ref(), &source.log_path()) {
            Ok(entries) => entries.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(source = %source.id, error = ?err, "Provenance log is corrupt, starting a new one");
                Vec::new()
            },
        };
        ProvenanceLog::new(entries, self.log_capacity)
    }

    fn retrieve(&self, source: &Source) -> Result<Retrieved> {
        match &source.location {
            Location::Remote(url) => {
                let response = self.transport.get(url)?;
                Ok(Retrieved { status: Some(response.status), success: response.is_success(), body: response.body })
            },
            Location::Local(path) => {
                let body = std::fs::read_to_string(path).or_raise(|| ErrorKind::LocalRead(path.clone()))?;
                Ok(Retrieved { status: None, success: true, body })
            },
        }
    }

    fn accept(&self, source: &Source, cached: Option<&CacheEntry>, retrieved: Retrieved) -> FetchOutcome {
        let identity_hash = source.format.identity_hash(&retrieved.body);
        let previous_hash = cached.map(|entry| entry.identity_hash.clone());
        let changed = previous_hash.as_deref() != Some(identity_hash.as_str());
        let content = match changed {
            true => {
                let entry = CacheEntry { identity_hash: identity_hash.clone(), content: retrieved.body };
                if let Err(err) = write_json(self.cache.as_ref(), &source.cache_path(), &entry) {
                    tracing::warn!(source = %source.id, error = ?err, "Could not update cache");
                }
                entry.content
            },
            false => {
                tracing::debug!(source = %source.id, "Content unchanged");
                retrieved.body
            },
        };
        let entry = ProvenanceEntry::now(Outcome::Success, Some(identity_hash.clone()), previous_hash, retrieved.status);
        self.append_log(source, entry);
        FetchOutcome::Fresh { content, identity_hash, changed }
    }

    fn fall_back(&self, source: &Source, cached: Option<CacheEntry>, status: Option<u16>) -> FetchOutcome {
        match cached {
            Some(entry) => {
                let hash = Some(entry.identity_hash.clone());
                self.append_log(source, ProvenanceEntry::now(Outcome::FallbackToCache, hash.clone(), hash, status));
                FetchOutcome::Fallback { content: entry.content, identity_hash: entry.identity_hash }
            },
            None => {
                match source.required {
                    true => tracing::error!(source = %source.id, "Required source unavailable and not cached"),
                    false => tracing::warn!(source = %source.id, "Source unavailable and not cached"),
                }
                self.append_log(source, ProvenanceEntry::now(Outcome::TotalFailure, None, None, status));
                FetchOutcome::Unavailable
            },
        }
    }

    fn load_cache(&self, source: &Source) -> Option<CacheEntry> {
        match read_json::<CacheEntry>(self.cache.as_ref(), &source.cache_path()) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(source = %source.id, error = ?err, "Cached copy is corrupt, ignoring it");
                None
            },
        }
    }

    fn append_log(&self, source: &Source, entry: ProvenanceEntry) {
        let mut log = self.log(source);
        log.record(entry);
        if let Err(err) = write_json(self.cache.as_ref(), &source.log_path(), log.entries()) {
            tracing::warn!(source = %source.id, error = ?err, "Could not write provenance log");
        }
    }
}
