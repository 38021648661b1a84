use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::risk::{RiskRecord, RiskTier};

/// The terminal artifact of a scan, in the shape written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub domain: String,
    pub timestamp: DateTime<Utc>,
    pub stats: ScanStats,
    /// Ordered by descending score, ties by ascending name.
    pub subdomains: Vec<SubdomainEntry>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub total_subdomains: usize,
    pub high_risk: usize,
    pub medium_risk: usize,
    pub low_risk: usize,
}

impl ScanStats {
    pub fn record(&mut self, tier: RiskTier) {
        self.total_subdomains += 1;
        match tier {
            RiskTier::High => self.high_risk += 1,
            RiskTier::Medium => self.medium_risk += 1,
            RiskTier::Low => self.low_risk += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubdomainEntry {
    pub name: String,
    pub risk_score: u8,
    pub reason: String,
    pub ip: Vec<IpAddr>,
    pub status: String,
}

impl From<&RiskRecord> for SubdomainEntry {
    fn from(record: &RiskRecord) -> Self {
        Self {
            name: record.name.clone(),
            risk_score: record.score.value(),
            reason: record.reasoning.clone(),
            ip: record.subdomain.ips(),
            status: record.subdomain.status_descriptor(),
        }
    }
}

impl ScanResult {
    pub fn top(&self, n: usize) -> &[SubdomainEntry] {
        &self.subdomains[..n.min(self.subdomains.len())]
    }
}
