use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    net::IpAddr,
};

use serde::{Deserialize, Serialize};

use crate::error::ResolutionFailure;

pub const NOT_PROBED: &str = "not probed";
pub const UNREACHABLE: &str = "unreachable";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
        };
        f.write_str(name)
    }
}

/// Final verdict of a lookup after every nameserver had its turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Success,
    Timeout,
    NxDomain,
    Error(ResolutionFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHost {
    pub name: String,
    pub records: BTreeMap<RecordType, BTreeSet<String>>,
    /// Canonical names followed from `name`, in lookup order.
    pub cname_chain: Vec<String>,
    pub outcome: Resolution,
}

impl ResolvedHost {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: BTreeMap::new(),
            cname_chain: Vec::new(),
            outcome: Resolution::Success,
        }
    }

    pub fn with_outcome(name: impl Into<String>, outcome: Resolution) -> Self {
        Self {
            outcome,
            ..Self::new(name)
        }
    }

    /// Builder used mostly by tests and fake resolvers.
    pub fn with_address(mut self, ip: IpAddr) -> Self {
        self.add_address(ip);
        self
    }

    pub fn add_address(&mut self, ip: IpAddr) {
        let record_type = match ip {
            IpAddr::V4(_) => RecordType::A,
            IpAddr::V6(_) => RecordType::Aaaa,
        };
        self.add_record(record_type, ip.to_string());
    }

    pub fn add_record(&mut self, record_type: RecordType, value: String) {
        self.records.entry(record_type).or_default().insert(value);
    }

    pub fn add_cname(&mut self, target: String) {
        if !self.cname_chain.contains(&target) {
            self.cname_chain.push(target.clone());
        }
        self.add_record(RecordType::Cname, target);
    }

    pub fn has_records(&self) -> bool {
        self.records.values().any(|values| !values.is_empty())
    }

    pub fn is_live(&self) -> bool {
        self.outcome == Resolution::Success && self.has_records()
    }

    /// Addresses from A and AAAA records, IPv4 first.
    pub fn ips(&self) -> Vec<IpAddr> {
        [RecordType::A, RecordType::Aaaa]
            .iter()
            .filter_map(|record_type| self.records.get(record_type))
            .flatten()
            .filter_map(|value| value.parse::<IpAddr>().ok())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Https,
    Http,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Https => "https",
            Scheme::Http => "http",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Responded { code: u16, scheme: Scheme },
    Unreachable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub host: String,
    pub status: ProbeStatus,
}

impl ProbeResult {
    pub fn responded(host: impl Into<String>, code: u16, scheme: Scheme) -> Self {
        Self {
            host: host.into(),
            status: ProbeStatus::Responded { code, scheme },
        }
    }

    pub fn unreachable(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            status: ProbeStatus::Unreachable {
                reason: reason.into(),
            },
        }
    }

    /// Short human readable form, e.g. `200 (https)` or `unreachable`.
    pub fn descriptor(&self) -> String {
        match &self.status {
            ProbeStatus::Responded { code, scheme } => format!("{code} ({scheme})"),
            ProbeStatus::Unreachable { .. } => UNREACHABLE.to_string(),
        }
    }
}

/// A candidate confirmed to resolve, optionally confirmed over HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSubdomain {
    pub host: ResolvedHost,
    pub probe: Option<ProbeResult>,
}

impl LiveSubdomain {
    pub fn new(host: ResolvedHost, probe: Option<ProbeResult>) -> Self {
        Self { host, probe }
    }

    pub fn name(&self) -> &str {
        &self.host.name
    }

    pub fn ips(&self) -> Vec<IpAddr> {
        self.host.ips()
    }

    pub fn status_descriptor(&self) -> String {
        self.probe
            .as_ref()
            .map(ProbeResult::descriptor)
            .unwrap_or_else(|| NOT_PROBED.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn ips_lists_ipv4_before_ipv6() {
        let host = ResolvedHost::new("www.example.com")
            .with_address(IpAddr::V6(Ipv6Addr::LOCALHOST))
            .with_address(IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34)));

        assert_eq!(
            host.ips(),
            vec![
                IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34)),
                IpAddr::V6(Ipv6Addr::LOCALHOST)
            ]
        );
    }

    #[test]
    fn cname_chain_keeps_order_without_duplicates() {
        let mut host = ResolvedHost::new("shop.example.com");
        host.add_cname("shops.myshopify.com".into());
        host.add_cname("edge.shopify.com".into());
        host.add_cname("shops.myshopify.com".into());

        assert_eq!(host.cname_chain, vec!["shops.myshopify.com", "edge.shopify.com"]);
        assert_eq!(host.records[&RecordType::Cname].len(), 2);
        assert!(host.is_live());
    }

    #[test]
    fn failed_outcome_is_never_live() {
        let host = ResolvedHost::with_outcome("ghost.example.com", Resolution::NxDomain);
        assert!(!host.is_live());
    }

    #[test]
    fn status_descriptor_variants() {
        let host = ResolvedHost::new("a.example.com");
        let unprobed = LiveSubdomain::new(host.clone(), None);
        assert_eq!(unprobed.status_descriptor(), "not probed");

        let ok = LiveSubdomain::new(
            host.clone(),
            Some(ProbeResult::responded("a.example.com", 301, Scheme::Http)),
        );
        assert_eq!(ok.status_descriptor(), "301 (http)");

        let down = LiveSubdomain::new(
            host,
            Some(ProbeResult::unreachable("a.example.com", "connection refused")),
        );
        assert_eq!(down.status_descriptor(), "unreachable");
    }
}
