//! Detects which change-feed candidates are new against the persisted
//! history.
//!
//! A candidate is known when its `<kind>_<version>` key, or its bare version,
//! is already in its product's history; legacy entries written without a
//! release kind only ever contribute the bare form. New entries are always
//! written in the typed form, so the bare form only matches legacy data.
//!
//! Everything the engine writes is derived from the candidates and the
//! history it was handed. A run interrupted before a product's history was
//! written produces the same new entries again when rerun.

use std::collections::{BTreeMap, HashSet};

use sofa_extract::canonical_json;
use sofa_extract::models::{ChangeFeedEntry, Product};
use tracing::instrument;

use crate::history::{History, HistoryStore};

/// What a diff produced.
#[derive(Debug, Default)]
pub struct DiffOutcome {
    /// Candidates that weren't in the history, in candidate order.
    pub new_entries: Vec<ChangeFeedEntry>,
    /// Every known entry across all products, deduplicated and ordered by
    /// ascending release date.
    pub combined: Vec<ChangeFeedEntry>,
    /// Products whose history was written back.
    pub persisted: Vec<Product>,
    /// Products whose history had new entries but couldn't be written.
    pub failed: Vec<Product>,
}
impl DiffOutcome {
    pub fn has_changes(&self) -> bool {
        !self.new_entries.is_empty()
    }
}

pub struct DiffEngine<'a> {
    store: &'a HistoryStore,
}
impl<'a> DiffEngine<'a> {
    pub fn new(store: &'a HistoryStore) -> Self {
        Self { store }
    }

    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub fn apply(&self, candidates: Vec<ChangeFeedEntry>, mut history: History) -> DiffOutcome {
        let mut outcome = DiffOutcome::default();

        let mut grouped: BTreeMap<Product, Vec<ChangeFeedEntry>> = BTreeMap::new();
        for candidate in candidates {
            grouped.entry(candidate.product_name).or_default().push(candidate);
        }

        for (product, candidates) in grouped {
            let entries = history.entry(product).or_default();
            let mut known: HashSet<String> = entries.iter().map(ChangeFeedEntry::identity_key).collect();
            let mut fresh = Vec::new();
            for candidate in candidates {
                let key = candidate.identity_key();
                if known.contains(&key) || known.contains(candidate.legacy_key()) {
                    continue;
                }
                known.insert(key);
                fresh.push(candidate);
            }
            if fresh.is_empty() {
                tracing::debug!(product = %product, "No new entries");
                continue;
            }

            tracing::info!(product = %product, new = fresh.len(), "Found new entries");
            entries.extend(fresh.iter().cloned());
            match self.store.save(product, entries) {
                Ok(()) => outcome.persisted.push(product),
                Err(err) => {
                    tracing::error!(product = %product, error = ?err, "Could not persist history");
                    outcome.failed.push(product);
                },
            }
            outcome.new_entries.extend(fresh);
        }

        outcome.combined = combine(history);
        outcome
    }
}

/// Flattens the history of every product, dropping structurally identical
/// entries, ordered by ascending release date.
fn combine(history: History) -> Vec<ChangeFeedEntry> {
    let mut seen = HashSet::new();
    let mut combined: Vec<ChangeFeedEntry> = history
        .into_values()
        .flatten()
        .filter(|entry| match serde_json::to_value(entry) {
            Ok(value) => seen.insert(canonical_json(value)),
            Err(_) => true,
        })
        .collect();
    combined.sort_by(|a, b| a.release_date.cmp(&b.release_date));
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use sofa_extract::models::{ReleaseDate, ReleaseKind};
    use sofa_storage::backend::MockBackend;
    use std::sync::Arc;

    fn config(version: &str, date: &str) -> ChangeFeedEntry {
        ChangeFeedEntry::component(
            ReleaseKind::Config,
            format!("XProtect Plist Config {version}"),
            version.to_string(),
            ReleaseDate::parse(date),
        )
    }

    fn os(version: &str, date: &str, kind: Option<ReleaseKind>) -> ChangeFeedEntry {
        ChangeFeedEntry {
            update_name: format!("macOS Sonoma {version}"),
            product_name: Product::MacOs,
            product_version: version.to_string(),
            release_date: ReleaseDate::parse(date),
            release_type: kind,
            security_info: None,
            supported_devices: None,
            cves: None,
            actively_exploited_cves: None,
            unique_cves_count: None,
            days_since_previous_release: Some(0),
        }
    }

    fn setup() -> (Arc<MockBackend>, HistoryStore) {
        let backend = Arc::new(MockBackend::default());
        let store = HistoryStore::new(backend.clone());
        (backend, store)
    }

    #[test]
    fn new_entries_are_persisted_and_combined() {
        let (backend, store) = setup();
        let candidates = vec![os("14.4", "2024-03-07", Some(ReleaseKind::Os)), config("5287", "2025-02-04")];
        let outcome = DiffEngine::new(&store).apply(candidates, History::new());

        assert_eq!(outcome.new_entries.len(), 2);
        assert_eq!(outcome.persisted, [Product::MacOs, Product::XProtect]);
        assert_eq!(backend.writes(), 2);
        let dates: Vec<_> = outcome.combined.iter().map(|e| e.release_date.to_string()).collect();
        assert_eq!(dates, ["2024-03-07T00:00:00Z", "2025-02-04T00:00:00Z"]);
    }

    #[test]
    fn rerun_is_idempotent() {
        let (backend, store) = setup();
        let candidates = || vec![os("14.4", "2024-03-07", Some(ReleaseKind::Os)), config("5287", "2025-02-04")];
        let first = DiffEngine::new(&store).apply(candidates(), store.load_all());
        let writes = backend.writes();

        let second = DiffEngine::new(&store).apply(candidates(), store.load_all());
        assert!(!second.has_changes());
        assert_eq!(backend.writes(), writes);
        assert_eq!(second.combined, first.combined);
    }

    #[rstest::rstest]
    #[case::typed(Some(ReleaseKind::Os))]
    #[case::legacy(None)]
    fn known_keys_in_either_form_are_not_duplicated(#[case] stored_kind: Option<ReleaseKind>) {
        let (backend, store) = setup();
        let history = History::from([(Product::MacOs, vec![os("14.4", "2024-03-07", stored_kind)])]);
        let candidates = vec![os("14.4", "2024-03-07", Some(ReleaseKind::Os))];
        let outcome = DiffEngine::new(&store).apply(candidates, history);

        assert!(outcome.new_entries.is_empty());
        assert_eq!(outcome.combined.len(), 1);
        assert_eq!(backend.writes(), 0);
    }

    #[test]
    fn same_version_of_another_kind_is_new() {
        let (_, store) = setup();
        let history = History::from([(Product::MacOs, vec![os("14.4.1", "2024-03-25", Some(ReleaseKind::Os))])]);
        let rsr = os("14.4.1", "2024-04-10", Some(ReleaseKind::RapidResponse('a')));
        let outcome = DiffEngine::new(&store).apply(vec![rsr], history);
        assert_eq!(outcome.new_entries.len(), 1);
        assert_eq!(outcome.combined.len(), 2);
    }

    #[test]
    fn duplicate_candidates_within_a_run_are_collapsed() {
        let (_, store) = setup();
        let candidates = vec![config("5287", "2025-02-04"), config("5287", "2025-02-04")];
        let outcome = DiffEngine::new(&store).apply(candidates, History::new());
        assert_eq!(outcome.new_entries.len(), 1);
        assert_eq!(store.load(Product::XProtect).len(), 1);
    }

    #[test]
    fn empty_candidates_keep_history() {
        let (backend, store) = setup();
        let history = History::from([(Product::XProtect, vec![config("5287", "2025-02-04")])]);
        let outcome = DiffEngine::new(&store).apply(Vec::new(), history);
        assert_eq!(outcome.combined.len(), 1);
        assert_eq!(backend.writes(), 0);
    }

    #[test]
    fn structurally_identical_entries_are_combined_once() {
        let entry = config("5287", "2025-02-04");
        let mut renamed = entry.clone();
        renamed.update_name = "XProtect 5287".to_string();
        let history = History::from([(Product::XProtect, vec![entry.clone(), entry, renamed])]);
        assert_eq!(combine(history).len(), 2);
    }
}
