//! Persisted state that carries the feed from one run to the next.
//!
//! # Architecture
//! - **History**: one `<Product>_rss_data.json` per product holding every
//!   change-feed entry ever published for it. History only grows; a run that
//!   finds nothing new leaves it untouched.
//! - **Diff**: the [`DiffEngine`] decides which candidates of a run are new
//!   against that history, persists them, and produces the combined feed.
//! - **Markers**: `timestamp.json` records when each family was last checked
//!   and the content hash of its snapshot, for external polling.

mod diff;
pub mod error;
mod history;
mod marker;

pub use crate::diff::{DiffEngine, DiffOutcome};
pub use crate::history::{History, HistoryStore};
pub use crate::marker::{RunMarker, RunMarkers};
