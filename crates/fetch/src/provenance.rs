use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// How a fetch attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Success,
    FallbackToCache,
    TotalFailure,
}

/// One fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Identity of the content this attempt left the source with.
    pub identity_hash: Option<String>,
    /// Identity of the cached content before this attempt.
    pub previous_hash: Option<String>,
    pub outcome: Outcome,
    /// HTTP status, when a response was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}
impl ProvenanceEntry {
    pub fn now(outcome: Outcome, identity_hash: Option<String>, previous_hash: Option<String>, status: Option<u16>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            timestamp: now.replace_nanosecond(0).unwrap_or(now),
            identity_hash,
            previous_hash,
            outcome,
            status,
        }
    }
}

/// Bounded fetch history for one source, most recent first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceLog {
    entries: Vec<ProvenanceEntry>,
    capacity: usize,
}
impl ProvenanceLog {
    pub fn new(entries: Vec<ProvenanceEntry>, capacity: usize) -> Self {
        let mut log = Self { entries, capacity: capacity.max(1) };
        log.settle();
        log
    }

    pub fn record(&mut self, entry: ProvenanceEntry) {
        self.entries.insert(0, entry);
        self.settle();
    }

    pub fn entries(&self) -> &[ProvenanceEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ProvenanceEntry> {
        self.entries
    }

    // Stable sort: an entry recorded in the same second as an older one
    // stays in front of it.
    fn settle(&mut self) {
        self.entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.entries.truncate(self.capacity);
    }
}
