use std::path::{Path, PathBuf};
use std::sync::Arc;

use rstest::{fixture, rstest};
use serde_json::Value;
use sofa_config::{Config, ModelTable, SoftwareRelease};
use sofa_extract::models::{ChangeFeedEntry, Family, Product};
use sofa_feed::error::ErrorKind;
use sofa_feed::{RunContext, RunReport, run};
use sofa_fetch::MockTransport;
use sofa_storage::backend::MockBackend;

const SONOMA_MODELS: &str = "https://models.example.test/sonoma.json";
const VENTURA_MODELS: &str = "https://models.example.test/ventura.json";
const CONFIG_DATA_MANIFEST: &str =
    "https://swdist.apple.com/content/downloads/24/48/041-12345/abc/XProtectPlistConfigData_10_15.pkm";
const PAYLOADS_MANIFEST: &str =
    "https://swdist.apple.com/content/downloads/61/13/041-67890/def/XProtectPayloads_10_15.pkm";

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn fixture_text(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).unwrap()
}

struct Harness {
    config: Config,
    transport: Arc<MockTransport>,
    cache: Arc<MockBackend>,
    output: Arc<MockBackend>,
    markers: Arc<MockBackend>,
}
impl Harness {
    fn context(&self) -> RunContext {
        RunContext::with_backends(
            self.config.clone(),
            self.transport.clone(),
            self.cache.clone(),
            self.output.clone(),
            self.markers.clone(),
            "timestamp.json",
        )
    }

    fn run(&self, families: &[Family]) -> RunReport {
        run(&mut self.context(), families)
    }

    fn output_json(&self, path: &str) -> Value {
        serde_json::from_str(&self.output.text(path).unwrap()).unwrap()
    }

    fn history(&self, file: &str) -> Vec<ChangeFeedEntry> {
        serde_json::from_str(&self.cache.text(file).unwrap()).unwrap()
    }
}

#[fixture]
fn harness() -> Harness {
    let mut config = Config::default();
    config.software_releases = vec![
        SoftwareRelease::new(Family::MacOs, "Sonoma 14"),
        SoftwareRelease::new(Family::MacOs, "Ventura 13"),
        SoftwareRelease::new(Family::Ios, "17"),
    ];
    config.model_tables =
        vec![ModelTable::new("macOS Sonoma 14", SONOMA_MODELS), ModelTable::new("macOS Ventura 13", VENTURA_MODELS)];
    config.supported_devices = Some(fixture_path("supported_devices.json").display().to_string());

    let sources = &config.sources;
    let transport = MockTransport::default()
        .respond(&sources.release_metadata.url, 200, fixture_text("gdmf.json"))
        .respond(&sources.security_index.url, 200, fixture_text("security_index.html"))
        .respond(&sources.software_catalog.url, 200, fixture_text("sucatalog.plist"))
        .respond(&sources.restore_images.url, 200, fixture_text("restore_images.plist"))
        .respond("https://support.apple.com/en-us/120895", 200, fixture_text("advisory_sonoma_14_4.html"))
        .respond("https://support.apple.com/en-us/120896", 200, fixture_text("advisory_ventura_13_6_5.html"))
        .respond("https://support.apple.com/en-us/120893", 200, fixture_text("advisory_ios_17_4.html"))
        .respond("https://support.apple.com/kb/HT214061", 200, fixture_text("advisory_sonoma_14_3.html"))
        .respond(SONOMA_MODELS, 200, fixture_text("models_sonoma.json"))
        .respond(VENTURA_MODELS, 200, fixture_text("models_ventura.json"))
        .respond(CONFIG_DATA_MANIFEST, 200, fixture_text("config_data.pkm"))
        .respond(PAYLOADS_MANIFEST, 200, fixture_text("payloads.pkm"));

    Harness {
        config,
        transport: Arc::new(transport),
        cache: Arc::new(MockBackend::default()),
        output: Arc::new(MockBackend::default()),
        markers: Arc::new(MockBackend::default()),
    }
}

#[rstest]
fn first_run_publishes_every_artifact(harness: Harness) {
    let report = harness.run(&[Family::MacOs, Family::Ios]);
    assert!(report.is_success());
    assert!(report.feed_written);
    assert_eq!(report.new_entries.len(), 8);

    assert!(harness.output.text("macos_data_feed.json").unwrap().starts_with("{\n    \"UpdateHash\": "));
    let macos = harness.output_json("macos_data_feed.json");

    let sonoma = &macos["OSVersions"][0];
    assert_eq!(sonoma["OSVersion"], "Sonoma 14");
    assert_eq!(sonoma["Latest"]["ProductVersion"], "14.4");
    assert_eq!(sonoma["Latest"]["Build"], "23E214");
    assert_eq!(sonoma["Latest"]["ReleaseDate"], "2024-03-07T00:00:00Z");
    assert_eq!(sonoma["Latest"]["ActivelyExploitedCVEs"], serde_json::json!(["CVE-2024-23225"]));
    assert_eq!(sonoma["Latest"]["UniqueCVEsCount"], 2);
    let days: Vec<_> = sonoma["SecurityReleases"]
        .as_array()
        .unwrap()
        .iter()
        .map(|release| release["DaysSincePreviousRelease"].as_i64().unwrap())
        .collect();
    assert_eq!(days, [24, 21, 0]);
    assert_eq!(sonoma["SecurityReleases"][1]["ReleaseType"], "RSR_a");
    assert_eq!(sonoma["SupportedModels"][0]["Model"], "MacBook Air (M2, 2022)");

    let ventura = &macos["OSVersions"][1];
    assert_eq!(ventura["Latest"]["ProductVersion"], "13.6.5");
    // Filled from the fallback device table.
    assert_eq!(ventura["Latest"]["SupportedDevices"], serde_json::json!(["Mac-7BA5B2D9E42DDD94", "iMac18,3"]));

    assert_eq!(macos["XProtectPlistConfigData"]["com.apple.XProtect"], "5287");
    assert_eq!(macos["XProtectPayloads"]["com.apple.XProtectFramework.XProtect"], "125");
    assert_eq!(macos["XProtectPayloads"]["ReleaseDate"], "2024-02-27T18:11:40Z");
    assert_eq!(macos["Models"]["Mac14,2"]["OSVersions"], serde_json::json!([14, 13]));
    assert_eq!(macos["InstallationApps"]["LatestMacIPSW"]["macos_ipsw_build"], "23E214");

    let ios = harness.output_json("ios_data_feed.json");
    // The newer 17.4 build is for another platform.
    assert_eq!(ios["OSVersions"][0]["Latest"]["Build"], "21E219");
    assert!(ios.get("XProtectPayloads").is_none());
    assert!(ios.get("Models").is_none());

    let markers: Value = serde_json::from_str(&harness.markers.text("timestamp.json").unwrap()).unwrap();
    assert_eq!(markers["macOS"]["UpdateHash"], macos["UpdateHash"]);
    assert_eq!(markers["iOS"]["UpdateHash"], ios["UpdateHash"]);

    let feed = harness.output.text("rss_feed.xml").unwrap();
    assert!(feed.contains("<guid isPermaLink=\"false\">macOS_OS_14.4</guid>"));
    assert!(feed.contains("<guid isPermaLink=\"false\">XProtect_Plug-in_63</guid>"));
    assert!(feed.find("macOS_OS_14.4").unwrap() < feed.find("macOS_OS_14.3<").unwrap());

    let xprotect = harness.history("XProtect_rss_data.json");
    let names: Vec<_> = xprotect.iter().map(|entry| entry.update_name.as_str()).collect();
    assert_eq!(names, ["XProtect Remediator 125", "XProtect Plug-in Service 63", "XProtect Plist Config 5287"]);
}

#[rstest]
fn rerun_on_unchanged_sources_is_idempotent(harness: Harness) {
    let first = harness.run(&[Family::MacOs, Family::Ios]);
    let history = harness.cache.text("macOS_rss_data.json").unwrap();
    let feed = harness.output.text("rss_feed.xml").unwrap();

    let second = harness.run(&[Family::MacOs, Family::Ios]);
    assert!(second.is_success());
    assert!(second.new_entries.is_empty());
    assert!(!second.feed_written);
    for (before, after) in first.families.iter().zip(&second.families) {
        let (before, after) = (before.result.as_ref().unwrap(), after.result.as_ref().unwrap());
        assert_eq!(before.snapshot.update_hash, after.snapshot.update_hash);
        assert!(!after.written);
    }
    assert_eq!(harness.cache.text("macOS_rss_data.json").unwrap(), history);
    assert_eq!(harness.output.text("rss_feed.xml").unwrap(), feed);
}

#[rstest]
fn failed_fetches_fall_back_to_cached_content(harness: Harness) {
    let live = harness.run(&[Family::MacOs, Family::Ios]);
    harness.transport.fail_all();
    let cached = harness.run(&[Family::MacOs, Family::Ios]);

    assert!(cached.is_success());
    for (live, cached) in live.families.iter().zip(&cached.families) {
        assert_eq!(live.result.as_ref().unwrap().snapshot, cached.result.as_ref().unwrap().snapshot);
    }
}

#[rstest]
fn unavailable_required_source_fails_the_family(harness: Harness) {
    harness.transport.fail_all();
    let report = harness.run(&[Family::MacOs, Family::Ios]);

    assert!(!report.is_success());
    assert_eq!(report.failed().count(), 2);
    for family in &report.families {
        let err = family.result.as_ref().unwrap_err();
        assert!(matches!(&**err, ErrorKind::SourceUnavailable(id) if id == "gdmf"));
    }
    assert!(harness.output.text("macos_data_feed.json").is_none());
    assert!(harness.output.text("rss_feed.xml").is_none());
    assert!(harness.markers.text("timestamp.json").is_none());
}

#[rstest]
fn unavailable_optional_sources_leave_their_data_out(harness: Harness) {
    harness.transport.set(&harness.config.sources.software_catalog.url, 503, "");
    harness.transport.set(&harness.config.sources.restore_images.url, 404, "");
    let report = harness.run(&[Family::MacOs]);

    assert!(report.is_success());
    let macos = harness.output_json("macos_data_feed.json");
    assert_eq!(macos["OSVersions"].as_array().unwrap().len(), 2);
    assert!(macos.get("XProtectPayloads").is_none());
    assert!(macos.get("InstallationApps").is_none());
    assert!(harness.cache.text("XProtect_rss_data.json").is_none());
}

#[rstest]
fn known_entries_are_not_repeated_in_either_key_form(harness: Harness) {
    let history = r#"[
        {"UpdateName": "macOS Sonoma 14.4", "ProductName": "macOS", "ProductVersion": "14.4",
         "ReleaseDate": "2024-03-07T00:00:00Z"},
        {"UpdateName": "macOS Ventura 13.6.5", "ProductName": "macOS", "ProductVersion": "13.6.5",
         "ReleaseDate": "2024-03-07T00:00:00Z", "ReleaseType": "OS"}
    ]"#;
    let cache = Arc::new(MockBackend::with_files([("macOS_rss_data.json", history)]));
    let harness = Harness { cache, ..harness };

    let report = harness.run(&[Family::MacOs]);
    let new: Vec<_> = report
        .new_entries
        .iter()
        .filter(|entry| entry.product_name == Product::MacOs)
        .map(ChangeFeedEntry::identity_key)
        .collect();
    assert_eq!(new, ["RSR_a_14.3.1", "OS_14.3"]);

    let persisted = harness.history("macOS_rss_data.json");
    let keys: Vec<_> = persisted.iter().map(ChangeFeedEntry::identity_key).collect();
    assert_eq!(keys, ["OS_14.3", "RSR_a_14.3.1", "14.4", "OS_13.6.5"]);

    let feed = harness.output.text("rss_feed.xml").unwrap();
    assert_eq!(feed.matches("Sonoma 14.4</title>").count(), 1);
}
