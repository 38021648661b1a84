//! # Scan Pipeline
//!
//! Implements the "rank the attack surface of a domain" use case.
//!
//! Orchestrates the scan by:
//! 1. loading candidates from the [`CandidateSource`].
//! 2. delegating discovery to the [`Enumerator`] (DNS, then optional HTTP).
//! 3. scoring the live set with the [`AiScorer`].
//! 4. ranking everything into a [`ScanResult`].
//!
//! Configuration problems surface from [`Pipeline::from_config`] and from
//! candidate loading, both before any packet leaves the machine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use subrank_common::cancel::CancelToken;
use subrank_common::config::ScanConfig;
use subrank_common::error::{ConfigurationError, FatalScoringError, ScoringFailure};
use subrank_common::models::{Candidate, LiveSubdomain, ScanResult};
use tracing::info;

use crate::aggregate::aggregate;
use crate::candidates::CandidateSource;
use crate::enumerator::{Enumerator, ProgressCallback};
use crate::probe::{HttpProbe, ReqwestProbe};
use crate::resolver::{DnsResolver, UdpResolver};
use crate::scoring::AiScorer;

#[derive(Debug)]
pub struct ScanReport {
    pub result: ScanResult,
    /// Reported once; the result still lists every live subdomain.
    pub fatal_scoring: Option<FatalScoringError>,
    pub warnings: Vec<ScoringFailure>,
    pub candidates: usize,
    pub elapsed: Duration,
}

pub struct Pipeline {
    candidates: CandidateSource,
    resolver: Arc<dyn DnsResolver>,
    probe: Option<Arc<dyn HttpProbe>>,
    scorer: AiScorer,
    on_progress: Option<ProgressCallback>,
    cancel: CancelToken,
}

impl Pipeline {
    /// Validates `config` and builds the production components from it.
    pub fn from_config(config: &ScanConfig, cancel: CancelToken) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let resolver: Arc<dyn DnsResolver> = Arc::new(UdpResolver::new(&config.dns)?);
        let probe: Option<Arc<dyn HttpProbe>> = if config.probe.enabled {
            Some(Arc::new(ReqwestProbe::new(&config.probe)?))
        } else {
            None
        };
        let scorer = AiScorer::from_settings(&config.scoring)?;

        Ok(Self::with_components(
            CandidateSource::new(),
            resolver,
            probe,
            scorer,
            cancel,
        ))
    }

    pub fn with_components(
        candidates: CandidateSource,
        resolver: Arc<dyn DnsResolver>,
        probe: Option<Arc<dyn HttpProbe>>,
        scorer: AiScorer,
        cancel: CancelToken,
    ) -> Self {
        Self {
            candidates,
            resolver,
            probe,
            scorer: scorer.with_cancel(cancel.clone()),
            on_progress: None,
            cancel,
        }
    }

    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Builds the production pipeline and runs it once.
    pub async fn run(config: &ScanConfig, cancel: CancelToken) -> Result<ScanReport, ConfigurationError> {
        Self::from_config(config, cancel)?.execute(config).await
    }

    pub async fn execute(&self, config: &ScanConfig) -> Result<ScanReport, ConfigurationError> {
        let started = Instant::now();
        let candidates: Vec<Candidate> = self.candidates.load(config.wordlist.as_deref())?;

        let live: Vec<LiveSubdomain> = self.enumerator(config).enumerate(&config.domain, &candidates).await?;
        info!("Discovery finished: {} live subdomains", live.len());

        let scoring = self.scorer.score(&config.domain, live).await;
        let result: ScanResult = aggregate(&config.domain, &scoring.records, &config.tiers);

        Ok(ScanReport {
            result,
            fatal_scoring: scoring.fatal,
            warnings: scoring.warnings,
            candidates: candidates.len(),
            elapsed: started.elapsed(),
        })
    }

    fn enumerator(&self, config: &ScanConfig) -> Enumerator {
        let mut enumerator = Enumerator::new(self.resolver.clone(), config.threads, config.limit)
            .with_cancel(self.cancel.clone());
        if let Some(probe) = &self.probe {
            enumerator = enumerator.with_probe(probe.clone());
        }
        if let Some(callback) = &self.on_progress {
            enumerator = enumerator.on_progress(callback.clone());
        }
        enumerator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::net::{IpAddr, Ipv4Addr};
    use subrank_common::config::SubdomainLimit;
    use subrank_common::models::{ResolvedHost, Resolution};

    struct OnlyApi;

    #[async_trait]
    impl DnsResolver for OnlyApi {
        async fn resolve(&self, name: &str) -> ResolvedHost {
            if name == "api.example.com" {
                ResolvedHost::new(name).with_address(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)))
            } else {
                ResolvedHost::with_outcome(name, Resolution::NxDomain)
            }
        }
    }

    fn config() -> ScanConfig {
        let mut config = ScanConfig::new("example.com".parse().unwrap());
        config.scoring.mock = true;
        config.limit = SubdomainLimit::Unlimited;
        config
    }

    fn pipeline(config: &ScanConfig, labels: &[&str]) -> Pipeline {
        Pipeline::with_components(
            CandidateSource::with_builtin(labels),
            Arc::new(OnlyApi),
            None,
            AiScorer::from_settings(&config.scoring).unwrap(),
            CancelToken::new(),
        )
    }

    #[tokio::test]
    async fn runs_discovery_scoring_and_ranking() {
        let config = config();
        let report = pipeline(&config, &["www", "api"]).execute(&config).await.unwrap();

        assert_eq!(report.candidates, 2);
        assert_eq!(report.result.subdomains.len(), 1);
        let entry = &report.result.subdomains[0];
        assert_eq!(entry.name, "api.example.com");
        assert_eq!(entry.risk_score, 8);
        assert_eq!(entry.status, "not probed");
        assert!(report.fatal_scoring.is_none());
    }

    #[tokio::test]
    async fn missing_wordlist_stops_before_discovery() {
        let mut config = config();
        config.wordlist = Some("/no/such/wordlist.txt".into());

        let err = pipeline(&config, &["api"]).execute(&config).await.unwrap_err();
        assert!(matches!(err, ConfigurationError::WordlistMissing(_)));
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let mut config = config();
        config.threads = 0;
        assert!(Pipeline::from_config(&config, CancelToken::new()).is_err());

        let mut config = self::config();
        config.scoring.mock = false;
        assert!(matches!(
            Pipeline::from_config(&config, CancelToken::new()),
            Err(ConfigurationError::MissingCredential(_))
        ));
    }
}
