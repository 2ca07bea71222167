use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use exn::ResultExt;
use serde::Serialize;
use serde_json::Value;
use sofa_extract::models::{ChangeFeedEntry, Product};
use sofa_storage::{BackendHandle, read_json, write_json};
use tracing::instrument;

use crate::error::{ErrorKind, Result};

const SUFFIX: &str = "_rss_data.json";

/// Every persisted change-feed entry, per product.
pub type History = BTreeMap<Product, Vec<ChangeFeedEntry>>;

/// An item of a history file as written back: either an entry, or one that
/// couldn't be read and is kept verbatim.
#[derive(Serialize)]
#[serde(untagged)]
enum Stored<'a> {
    Entry(&'a ChangeFeedEntry),
    Unread(Value),
}

/// Per-product change history on top of a storage backend.
///
/// Items of a history file that don't read as an entry (an unknown release
/// type, a product this build doesn't know) are skipped when loading but
/// never dropped from the file.
#[derive(Clone)]
pub struct HistoryStore {
    backend: BackendHandle,
}
impl HistoryStore {
    pub fn new(backend: BackendHandle) -> Self {
        Self { backend }
    }

    /// `<Product>_rss_data.json`
    pub fn path(product: Product) -> PathBuf {
        PathBuf::from(format!("{product}{SUFFIX}"))
    }

    /// The items of a history file, `None` when it doesn't exist.
    fn items(&self, path: &Path) -> sofa_storage::error::Result<Option<Vec<Value>>> {
        read_json::<Vec<Value>>(self.backend.as_ref(), path)
    }

    /// A product's history. A missing or unreadable file is empty, and
    /// unreadable items are skipped.
    pub fn load(&self, product: Product) -> Vec<ChangeFeedEntry> {
        let items = match self.items(&Self::path(product)) {
            Ok(items) => items.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(product = %product, error = ?err, "History is unreadable, treating it as empty");
                return Vec::new();
            },
        };
        let total = items.len();
        let entries: Vec<ChangeFeedEntry> =
            items.into_iter().filter_map(|item| serde_json::from_value(item).ok()).collect();
        if entries.len() < total {
            tracing::warn!(product = %product, skipped = total - entries.len(), "Skipped unreadable history entries");
        }
        entries
    }

    /// The history of every product with a history file, plus an empty one
    /// for every product without.
    #[instrument(skip(self))]
    pub fn load_all(&self) -> History {
        let mut history: History = Product::ALL.into_iter().map(|product| (product, Vec::new())).collect();
        let files = match self.backend.list(None) {
            Ok(files) => files,
            Err(err) => {
                tracing::warn!(error = ?err, "Could not list history files, reading the known products");
                Product::ALL.into_iter().for_each(|product| {
                    history.insert(product, self.load(product));
                });
                return history;
            },
        };
        for file in files {
            if file.path.components().count() != 1 {
                continue;
            }
            let Some(stem) = file.path.to_str().and_then(|name| name.strip_suffix(SUFFIX)) else {
                continue;
            };
            match stem.parse::<Product>().ok().filter(|product| product.as_str() == stem) {
                Some(product) => {
                    tracing::debug!(path = %file.path.display(), bytes = file.size, "Reading history");
                    history.insert(product, self.load(product));
                },
                None => tracing::warn!(path = %file.path.display(), "History file of an unknown product, leaving it alone"),
            }
        }
        tracing::debug!(entries = history.values().map(Vec::len).sum::<usize>(), "Loaded history");
        history
    }

    /// Writes one product's history, ordered by release date, followed by
    /// the items of the current file that couldn't be read.
    ///
    /// A current file that isn't a list of items is left untouched and the
    /// save fails.
    pub fn save(&self, product: Product, entries: &mut [ChangeFeedEntry]) -> Result<()> {
        let path = Self::path(product);
        let current = self.items(&path).or_raise(|| ErrorKind::HistoryUnreadable(product))?.unwrap_or_default();
        let unread = current.into_iter().filter(|item| serde_json::from_value::<ChangeFeedEntry>(item.clone()).is_err());

        entries.sort_by(|a, b| a.release_date.cmp(&b.release_date));
        let items: Vec<Stored<'_>> = entries.iter().map(Stored::Entry).chain(unread.map(Stored::Unread)).collect();
        write_json(self.backend.as_ref(), &path, &items).or_raise(|| ErrorKind::HistoryWrite(product))
    }
}
