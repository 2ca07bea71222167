//! One run of the feed: fetch, normalize, aggregate, diff, publish.
//!
//! A [`RunContext`] is built once per invocation and carries everything the
//! run touches. [`run`] processes each requested family in turn; a family
//! that fails is reported and skipped, the others still publish. Once every
//! family is done, the change-feed candidates of all of them are diffed
//! against the persisted history in one pass and the syndication feed is
//! rendered from the result.

mod aggregate;
mod context;
mod emit;
pub mod error;
mod pipeline;
mod policy;
mod rss;
mod snapshot;
mod sources;

pub use crate::aggregate::{AdvisoryLookup, Aggregator, days_since_previous};
pub use crate::context::RunContext;
pub use crate::emit::{snapshot_path, write_snapshot};
pub use crate::pipeline::{FamilyReport, Published, RunReport, run};
pub use crate::policy::{Desktop, FamilyPolicy, Mobile, policy_for};
pub use crate::rss::RssFeed;
pub use crate::snapshot::{FeedSnapshot, InstallationApps, OsVersionEntry, SnapshotBody};
