use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use subrank_common::cancel::CancelToken;
use subrank_common::config::{ScanConfig, SubdomainLimit};
use subrank_common::models::{ResolvedHost, Resolution};
use subrank_core::candidates::CandidateSource;
use subrank_core::pipeline::Pipeline;
use subrank_core::resolver::DnsResolver;
use subrank_core::scoring::AiScorer;

/// Answers from a fixed table; every other name is NXDOMAIN.
#[derive(Default)]
pub struct StaticResolver {
    records: HashMap<String, IpAddr>,
    lookups: AtomicUsize,
}

impl StaticResolver {
    pub fn new(records: &[(&str, &str)]) -> Self {
        Self {
            records: records
                .iter()
                .filter_map(|(name, ip)| Some((name.to_string(), ip.parse().ok()?)))
                .collect(),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DnsResolver for StaticResolver {
    async fn resolve(&self, name: &str) -> ResolvedHost {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        match self.records.get(name) {
            Some(ip) => ResolvedHost::new(name).with_address(*ip),
            None => ResolvedHost::with_outcome(name, Resolution::NxDomain),
        }
    }
}

pub fn config(domain: &str) -> ScanConfig {
    let mut config = ScanConfig::new(domain.parse().expect("valid test domain"));
    config.limit = SubdomainLimit::Unlimited;
    config.scoring.mock = true;
    config
}

pub fn pipeline(config: &ScanConfig, labels: &[&str], resolver: Arc<StaticResolver>) -> Pipeline {
    let scorer = AiScorer::from_settings(&config.scoring).expect("scorer builds from test settings");
    Pipeline::with_components(
        CandidateSource::with_builtin(labels),
        resolver,
        None,
        scorer,
        CancelToken::new(),
    )
}
