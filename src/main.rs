//! `sofa`: one pass of the release feed for the requested OS families.

mod error;
mod telemetry;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use exn::ResultExt;
use sofa_config::Config;
use sofa_extract::models::Family;
use sofa_feed::{RunContext, RunReport};

use crate::error::{ErrorKind, Result};

#[derive(Debug, Parser)]
#[command(name = "sofa", version, about = "Builds the SOFA feed of Apple OS releases")]
struct Cli {
    /// Configuration file (JSON, TOML or YAML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fetch and assemble everything, but write nothing.
    #[arg(long)]
    dry_run: bool,

    /// Log newline-delimited JSON instead of text.
    #[arg(long)]
    json_logs: bool,

    /// More log output; repeat for more.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// OS families to process, e.g. `macOS iOS`.
    #[arg(required = true, value_parser = parse_family)]
    families: Vec<Family>,
}

fn parse_family(raw: &str) -> std::result::Result<Family, String> {
    raw.parse().map_err(|_| format!("unknown OS family '{raw}', expected one of: macOS, iOS"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init(cli.json_logs, telemetry::level(cli.verbose));

    match execute(&cli) {
        Ok(report) => summarize(&report),
        Err(err) => {
            tracing::error!(error = ?err, "Run aborted");
            ExitCode::FAILURE
        },
    }
}

fn execute(cli: &Cli) -> Result<RunReport> {
    let mut families: Vec<Family> = Vec::new();
    for family in &cli.families {
        if !families.contains(family) {
            families.push(*family);
        }
    }
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    config.validate_for(&families).or_raise(|| ErrorKind::Config)?;
    if cli.dry_run {
        tracing::info!("Dry run, nothing will be written");
    }
    let mut ctx = RunContext::new(config, cli.dry_run).or_raise(|| ErrorKind::Setup)?;
    Ok(sofa_feed::run(&mut ctx, &families))
}

fn summarize(report: &RunReport) -> ExitCode {
    for family in &report.families {
        match &family.result {
            Ok(published) => tracing::info!(
                family = %family.family,
                hash = %published.snapshot.update_hash,
                written = published.written,
                "Published"
            ),
            Err(err) => tracing::error!(family = %family.family, error = ?err, "Failed"),
        }
    }
    tracing::info!(new_entries = report.new_entries.len(), feed_written = report.feed_written, "Run complete");
    match report.is_success() {
        true => ExitCode::SUCCESS,
        false => ExitCode::FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn families_and_flags_parse() {
        let cli = Cli::try_parse_from(["sofa", "-vv", "--dry-run", "macos", "iOS"]).unwrap();
        assert_eq!(cli.families, [Family::MacOs, Family::Ios]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.dry_run);
        assert!(!cli.json_logs);
    }

    #[test]
    fn unknown_families_are_rejected() {
        assert!(Cli::try_parse_from(["sofa", "watchOS"]).is_err());
        assert!(Cli::try_parse_from(["sofa"]).is_err());
    }
}
