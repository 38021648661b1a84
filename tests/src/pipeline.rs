use std::io::Write;
use std::sync::Arc;

use subrank_common::config::SubdomainLimit;
use subrank_common::models::ScanResult;

use crate::support::{StaticResolver, config, pipeline};

const EXAMPLE_RECORDS: &[(&str, &str)] = &[
    ("www.example.com", "93.184.216.34"),
    ("admin.example.com", "93.184.216.35"),
];

#[tokio::test]
async fn offline_scan_ranks_only_live_names() {
    let config = config("example.com");
    let resolver = Arc::new(StaticResolver::new(EXAMPLE_RECORDS));

    let report = pipeline(&config, &["www", "admin", "ghost"], resolver.clone())
        .execute(&config)
        .await
        .unwrap();

    let names: Vec<&str> = report.result.subdomains.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["admin.example.com", "www.example.com"]);
    assert_eq!(report.result.subdomains[0].risk_score, 9);
    assert_eq!(report.result.subdomains[1].risk_score, 5);
    assert_eq!(report.result.stats.total_subdomains, 2);
    assert_eq!(report.result.stats.high_risk, 1);
    assert_eq!(report.result.stats.medium_risk, 1);
    assert_eq!(resolver.lookups(), 3);
    assert!(report.fatal_scoring.is_none());
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn wordlist_labels_are_scanned_once() {
    let mut wordlist = tempfile::NamedTempFile::new().unwrap();
    writeln!(wordlist, "# staging hosts\nADMIN\nvpn\n\nwww").unwrap();

    let mut config = config("example.com");
    config.wordlist = Some(wordlist.path().to_path_buf());
    let resolver = Arc::new(StaticResolver::new(&[
        ("admin.example.com", "10.0.0.1"),
        ("vpn.example.com", "10.0.0.2"),
    ]));

    let report = pipeline(&config, &["www", "admin"], resolver.clone())
        .execute(&config)
        .await
        .unwrap();

    assert_eq!(report.candidates, 3);
    assert_eq!(resolver.lookups(), 3);
    let names: Vec<&str> = report.result.subdomains.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["admin.example.com", "vpn.example.com"]);
}

#[tokio::test]
async fn cap_bounds_the_ranking() {
    let mut config = config("example.com");
    config.threads = 1;
    config.limit = SubdomainLimit::Capped(1);
    let resolver = Arc::new(StaticResolver::new(EXAMPLE_RECORDS));

    let report = pipeline(&config, &["www", "admin", "ghost"], resolver)
        .execute(&config)
        .await
        .unwrap();

    assert_eq!(report.result.subdomains.len(), 1);
    assert_eq!(report.result.stats.total_subdomains, 1);
}

#[tokio::test]
async fn nothing_live_still_produces_a_result() {
    let config = config("example.com");
    let resolver = Arc::new(StaticResolver::new(&[]));

    let report = pipeline(&config, &["ghost", "phantom"], resolver)
        .execute(&config)
        .await
        .unwrap();

    assert!(report.result.subdomains.is_empty());
    assert_eq!(report.result.stats.total_subdomains, 0);
}

#[tokio::test]
async fn report_survives_a_json_round_trip() {
    let config = config("example.com");
    let resolver = Arc::new(StaticResolver::new(EXAMPLE_RECORDS));
    let report = pipeline(&config, &["www", "admin"], resolver)
        .execute(&config)
        .await
        .unwrap();

    let json = serde_json::to_string_pretty(&report.result).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["domain"], "example.com");
    assert_eq!(value["subdomains"][0]["ip"][0], "93.184.216.35");
    assert_eq!(value["subdomains"][0]["status"], "not probed");

    let parsed: ScanResult = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, report.result);
}
