//! Retrieval of upstream sources.
//!
//! A [`ResilientFetcher`] never fails outright: every fetch either returns
//! fresh content, falls back to the last good copy in the cache, or reports
//! the source as unavailable. Each attempt is appended to the source's
//! provenance log.

pub mod error;
mod fetcher;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod provenance;
mod source;
mod transport;

pub use crate::fetcher::{CacheEntry, FetchOutcome, ResilientFetcher};
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::MockTransport;
pub use crate::provenance::{Outcome, ProvenanceEntry, ProvenanceLog};
pub use crate::source::{Location, Source, SourceFormat, resolve_link, url_source_id};
pub use crate::transport::{HttpTransport, Response, Transport};
