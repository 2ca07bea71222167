use std::path::PathBuf;

use exn::ResultExt;
use sofa_cache::DiffEngine;
use sofa_extract::Normalizer;
use sofa_extract::models::{AssetCatalog, BundleVersions, ChangeFeedEntry, Family, ModelEntry, Product};
use sofa_extract::normalize::{
    BundleManifestNormalizer, CatalogNormalizer, IndexRow, ModelTableNormalizer, ReleaseMetadataNormalizer,
    RestoreImageNormalizer, SecurityIndexNormalizer, SoftwareCatalog, SupportedDevicesNormalizer, merge_model_tables,
};
use time::OffsetDateTime;
use tracing::instrument;

use crate::aggregate::Aggregator;
use crate::context::RunContext;
use crate::emit::write_snapshot;
use crate::error::{Error, ErrorKind, Result};
use crate::policy::{FamilyPolicy, policy_for};
use crate::rss::RssFeed;
use crate::snapshot::{FeedSnapshot, InstallationApps, SnapshotBody};
use crate::sources;

const CONFIG_DATA_MARKER: &str = "XProtectPlistConfigData";
const PAYLOADS_MARKER: &str = "XProtectPayloads";

/// A family's published snapshot.
#[derive(Debug)]
pub struct Published {
    pub snapshot: FeedSnapshot,
    /// Whether the snapshot file was (re)written.
    pub written: bool,
}

#[derive(Debug)]
pub struct FamilyReport {
    pub family: Family,
    pub result: Result<Published>,
}

/// Outcome of one run over the requested families.
#[derive(Debug, Default)]
pub struct RunReport {
    pub families: Vec<FamilyReport>,
    pub new_entries: Vec<ChangeFeedEntry>,
    /// Products whose updated history couldn't be persisted.
    pub history_failures: Vec<Product>,
    pub feed_written: bool,
    /// Failures publishing the syndication feed or the run markers.
    pub errors: Vec<Error>,
}
impl RunReport {
    pub fn failed(&self) -> impl Iterator<Item = &FamilyReport> {
        self.families.iter().filter(|report| report.result.is_err())
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none() && self.history_failures.is_empty() && self.errors.is_empty()
    }
}

/// Processes `families` in order, then diffs the change-feed candidates of
/// every family that succeeded and publishes the syndication feed.
#[instrument(skip(ctx))]
pub fn run(ctx: &mut RunContext, families: &[Family]) -> RunReport {
    let mut report = RunReport::default();
    let mut markers = ctx.markers();
    let mut candidates = Vec::new();

    for &family in families {
        let result = process_family(ctx, family);
        match &result {
            Ok(published) => {
                candidates.extend(published.snapshot.change_feed_entries());
                markers.record(family, &published.snapshot.update_hash, OffsetDateTime::now_utc());
            },
            Err(err) => tracing::error!(family = %family, error = ?err, "Family failed, continuing with the rest"),
        }
        report.families.push(FamilyReport { family, result });
    }

    let store = ctx.history();
    let outcome = DiffEngine::new(&store).apply(candidates, store.load_all());
    match publish_feed(ctx, &outcome.combined, outcome.has_changes()) {
        Ok(written) => report.feed_written = written,
        Err(err) => {
            tracing::error!(error = ?err, "Could not publish the syndication feed");
            report.errors.push(err);
        },
    }
    report.new_entries = outcome.new_entries;
    report.history_failures = outcome.failed;

    if report.families.iter().any(|family| family.result.is_ok())
        && let Err(err) = ctx.save_markers(&markers)
    {
        tracing::error!(error = ?err, "Could not save the run markers");
        report.errors.push(err);
    }
    report
}

#[instrument(skip(ctx))]
fn process_family(ctx: &mut RunContext, family: Family) -> Result<Published> {
    let policy = policy_for(family);
    let config = ctx.config();
    let releases: Vec<String> = config.releases(family).map(|release| release.name.clone()).collect();
    let metadata_source = sources::release_metadata(config);
    let index_source = sources::security_index(config);
    let index_url = config.sources.security_index.url.clone();

    let catalog: AssetCatalog = match ctx.content(&metadata_source)? {
        Some(raw) => ReleaseMetadataNormalizer.normalize_lenient(&raw),
        None => AssetCatalog::default(),
    };
    let index: Vec<IndexRow> = match ctx.content(&index_source)? {
        Some(raw) => SecurityIndexNormalizer.normalize_lenient(&raw),
        None => Vec::new(),
    };
    let tables = match policy.includes_side_data() {
        true => model_tables(ctx),
        false => Vec::new(),
    };

    let aggregator = Aggregator::new(policy, catalog.records(family.as_str()), &index, &index_url);
    let mut body = SnapshotBody::default();
    for name in &releases {
        let supported_models = supported_models(policy, &tables, name);
        body.os_versions.extend(aggregator.os_version(name, &mut *ctx, supported_models));
    }
    if policy.includes_side_data() {
        side_data(ctx, &mut body, &tables);
    }

    let snapshot = FeedSnapshot::stamp(family, body)?;
    let written = write_snapshot(ctx.output().as_ref(), family, &snapshot)?;
    tracing::info!(hash = %snapshot.update_hash, versions = snapshot.body.os_versions.len(), "Family processed");
    Ok(Published { snapshot, written })
}

/// Every configured model table with its generation label, in configured
/// order. Unavailable tables are empty.
fn model_tables(ctx: &mut RunContext) -> Vec<(String, Vec<ModelEntry>)> {
    let tables = ctx.config().model_tables.clone();
    tables
        .iter()
        .map(|table| (table.label.clone(), ctx.normalized(&sources::model_table(table), ModelTableNormalizer)))
        .collect()
}

/// The models of the table labelled with `name` ("macOS Sonoma 14" for
/// "Sonoma 14").
fn supported_models(
    policy: &dyn FamilyPolicy,
    tables: &[(String, Vec<ModelEntry>)],
    name: &str,
) -> Option<Vec<ModelEntry>> {
    if !policy.includes_side_data() {
        return None;
    }
    let models = tables
        .iter()
        .find(|(label, _)| label.split_once(' ').is_some_and(|(_, generation)| generation.trim() == name))
        .map(|(_, models)| models.clone())
        .unwrap_or_default();
    Some(models)
}

fn side_data(ctx: &mut RunContext, body: &mut SnapshotBody, tables: &[(String, Vec<ModelEntry>)]) {
    body.models = Some(merge_model_tables(tables.iter().map(|(label, models)| (label.as_str(), models.as_slice()))));

    let catalog = sources::software_catalog(ctx.config());
    let software = ctx.normalized(&catalog, CatalogNormalizer);
    body.xprotect_config = bundle_versions(ctx, &software, CONFIG_DATA_MARKER);
    body.xprotect_payloads = bundle_versions(ctx, &software, PAYLOADS_MARKER);

    let restore = sources::restore_images(ctx.config());
    body.installation_apps = ctx
        .normalized(&restore, RestoreImageNormalizer)
        .map(|image| InstallationApps { latest_mac_ipsw: Some(image) });

    if let Some(location) = ctx.config().supported_devices.clone() {
        let table = ctx.normalized(&sources::supported_devices(&location), SupportedDevicesNormalizer);
        body.fill_supported_devices(&table);
    }
}

/// Bundle versions of the catalog's first manifest mentioning `marker`,
/// dated by the product that ships it.
fn bundle_versions(ctx: &mut RunContext, catalog: &SoftwareCatalog, marker: &str) -> Option<BundleVersions> {
    let Some((product, url)) = catalog.find_manifest(marker) else {
        tracing::debug!(marker, "Software catalog lists no matching manifest");
        return None;
    };
    let bundles = ctx.normalized(&sources::bundle_manifest(url), BundleManifestNormalizer);
    if bundles.is_empty() {
        return None;
    }
    Some(BundleVersions { bundles, release_date: product.post_date.clone() })
}

/// Renders the combined history. The feed is left alone when nothing new
/// was found and it has been published before.
#[instrument(skip_all, fields(entries = combined.len(), changed = changed))]
fn publish_feed(ctx: &RunContext, combined: &[ChangeFeedEntry], changed: bool) -> Result<bool> {
    let feed = RssFeed::new(ctx.config().feed.clone())?;
    let path = PathBuf::from(feed.file_name());
    let output = ctx.output();
    let published = output.exists(&path).unwrap_or(false);
    if !changed && published {
        tracing::info!("Syndication feed unchanged");
        return Ok(false);
    }
    let Some(xml) = feed.render(combined, OffsetDateTime::now_utc())? else {
        tracing::info!("History is empty, no syndication feed to publish");
        return Ok(false);
    };
    output.write(&path, xml.as_bytes()).or_raise(|| ErrorKind::Output(path.clone()))?;
    tracing::info!(path = %path.display(), "Wrote syndication feed");
    Ok(true)
}
