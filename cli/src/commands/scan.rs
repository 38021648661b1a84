use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use colored::*;
use tracing::{Instrument, info_span};

use crate::mprint;
use crate::terminal::{colors, format, print, spinner};
use subrank_common::cancel::CancelToken;
use subrank_common::config::ScanConfig;
use subrank_common::models::{ScanResult, TierBoundaries};
use subrank_common::{error, success, warn};
use subrank_core::enumerator::Progress;
use subrank_core::pipeline::{Pipeline, ScanReport};

const RESULTS_DIR: &str = "results";

pub struct ScanOptions {
    pub output: Option<PathBuf>,
    pub top: usize,
    pub quiet: u8,
}

pub async fn scan(config: &ScanConfig, options: &ScanOptions, cancel: CancelToken) -> anyhow::Result<()> {
    let span = info_span!("scan", indicatif.pb_show = true);
    spinner::start(&span);

    let progress_span = span.clone();
    let pipeline = Pipeline::from_config(config, cancel)?.on_progress(Arc::new(move |p: Progress| {
        spinner::report_progress(&progress_span, p)
    }));

    let report: ScanReport = pipeline.execute(config).instrument(span.clone()).await?;
    drop(pipeline);
    drop(span);

    if let Some(fatal) = &report.fatal_scoring {
        error!("AI scoring unavailable: {fatal}. Results carry the fallback score.");
    }
    if !report.warnings.is_empty() {
        warn!("{} scoring warnings, affected subdomains were given the fallback score", report.warnings.len());
    }

    let path: PathBuf = options
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&report.result.domain, report.result.timestamp));
    write_json(&report.result, &path)?;

    scan_ends(&report, &config.tiers, options);
    success!("Results saved to {}", path.display());
    Ok(())
}

fn scan_ends(report: &ScanReport, tiers: &TierBoundaries, options: &ScanOptions) {
    let result: &ScanResult = &report.result;
    if result.subdomains.is_empty() {
        if options.quiet == 0 {
            print::section("zero subdomains found");
            print::no_results();
        }
        return;
    }

    if options.quiet == 0 {
        print::section("risk ranking");
    }
    let shown = result.top(options.top);
    for (idx, entry) in shown.iter().enumerate() {
        for line in format::ranked_entry(idx, entry, tiers, options.quiet < 2) {
            mprint!(&line);
        }
        if options.quiet < 2 && idx + 1 != shown.len() {
            mprint!();
        }
    }
    let hidden: usize = result.subdomains.len() - shown.len();
    if hidden > 0 {
        mprint!(&format!(
            "{} {hidden} more in the JSON report",
            ">".color(colors::SEPARATOR)
        ));
    }

    print_summary(report, options.quiet);
}

fn print_summary(report: &ScanReport, quiet: u8) {
    let stats = &report.result.stats;
    if quiet == 0 {
        print::section("summary");
        print::summary_line("Candidates", report.candidates);
        print::summary_line("Live", stats.total_subdomains);
        print::summary_line("High risk", stats.high_risk.to_string().color(colors::HIGH_RISK).bold());
        print::summary_line("Medium risk", stats.medium_risk.to_string().color(colors::MEDIUM_RISK).bold());
        print::summary_line("Low risk", stats.low_risk.to_string().color(colors::LOW_RISK).bold());
    }

    let live: ColoredString = format!("{} live subdomains", stats.total_subdomains).bold().green();
    let elapsed: ColoredString = elapsed_text(report.elapsed).bold().yellow();
    let output: String = format!("Scan Complete: {live} ranked in {elapsed}");

    match quiet {
        0 => {
            print::fat_separator();
            print::centerln(&output);
        }
        _ => success!("{}", output),
    }
}

fn elapsed_text(elapsed: Duration) -> String {
    format!("{:.2}s", elapsed.as_secs_f64())
}

pub fn default_output_path(domain: &str, timestamp: DateTime<Utc>) -> PathBuf {
    Path::new(RESULTS_DIR).join(format!(
        "{domain}_{}_ranked.json",
        timestamp.format("%Y%m%d_%H%M%S")
    ))
}

pub fn write_json(result: &ScanResult, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json: String = serde_json::to_string_pretty(result).context("failed to serialize results")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use subrank_common::models::{ScanStats, SubdomainEntry};

    fn result() -> ScanResult {
        ScanResult {
            domain: "example.com".into(),
            timestamp: Utc.with_ymd_and_hms(2026, 10, 17, 8, 30, 0).unwrap(),
            stats: ScanStats {
                total_subdomains: 1,
                high_risk: 1,
                medium_risk: 0,
                low_risk: 0,
            },
            subdomains: vec![SubdomainEntry {
                name: "admin.example.com".into(),
                risk_score: 9,
                reason: "Administrative interface".into(),
                ip: vec!["93.184.216.34".parse().unwrap()],
                status: "200 (https)".into(),
            }],
        }
    }

    #[test]
    fn default_path_is_stamped() {
        let path = default_output_path("example.com", result().timestamp);
        assert_eq!(path, PathBuf::from("results/example.com_20261017_083000_ranked.json"));
    }

    #[test]
    fn json_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");

        write_json(&result(), &path).unwrap();

        let written: ScanResult = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, result());
    }

    #[test]
    fn elapsed_has_two_decimals() {
        assert_eq!(elapsed_text(Duration::from_millis(1234)), "1.23s");
    }
}
