use chrono::{DateTime, Utc};
use subrank_common::models::{RiskRecord, ScanResult, ScanStats, SubdomainEntry, TierBoundaries};
use subrank_common::target::Domain;

/// Ranks the records and stamps the result with the current time.
pub fn aggregate(domain: &Domain, records: &[RiskRecord], tiers: &TierBoundaries) -> ScanResult {
    aggregate_at(domain, records, tiers, Utc::now())
}

/// Same as [`aggregate`] with a fixed timestamp.
pub fn aggregate_at(
    domain: &Domain,
    records: &[RiskRecord],
    tiers: &TierBoundaries,
    timestamp: DateTime<Utc>,
) -> ScanResult {
    let mut ranked: Vec<&RiskRecord> = records.iter().collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));

    let mut stats = ScanStats::default();
    for record in &ranked {
        stats.record(tiers.tier(record.score));
    }

    ScanResult {
        domain: domain.to_string(),
        timestamp,
        stats,
        subdomains: ranked.into_iter().map(SubdomainEntry::from).collect(),
    }
}
