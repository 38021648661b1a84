//! # Scan Configuration
//!
//! [`ScanConfig`] is built once at process start (usually from CLI flags) and
//! passed by reference into every pipeline stage. There is no global state.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigurationError;
use crate::models::{RecordType, RiskScore, TierBoundaries};
use crate::target::Domain;

pub const DEFAULT_THREADS: usize = 10;
pub const DEFAULT_SUBDOMAIN_LIMIT: usize = 200;
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_DNS_RETRIES: u32 = 1;
pub const DEFAULT_CNAME_DEPTH: usize = 8;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DNS_PORT: u16 = 53;

pub const DEFAULT_NAMESERVERS: &[&str] = &[
    "8.8.8.8",
    "8.8.4.4",
    "1.1.1.1",
    "1.0.0.1",
    "9.9.9.9",
    "149.112.112.112",
    "208.67.222.222",
    "208.67.220.220",
];

pub const DEFAULT_BATCH_SIZE: usize = 25;
pub const DEFAULT_SCORING_CONCURRENCY: usize = 2;
pub const DEFAULT_REQUESTS_PER_WINDOW: u32 = 10;
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_RETRIES: u32 = 4;
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_FALLBACK_SCORE: u8 = 0;

/// Upper bound on the number of live subdomains collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubdomainLimit {
    Capped(usize),
    Unlimited,
}

impl Default for SubdomainLimit {
    fn default() -> Self {
        SubdomainLimit::Capped(DEFAULT_SUBDOMAIN_LIMIT)
    }
}

impl SubdomainLimit {
    pub fn is_reached(&self, count: usize) -> bool {
        match self {
            SubdomainLimit::Capped(max) => count >= *max,
            SubdomainLimit::Unlimited => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DnsSettings {
    /// `ip` or `ip:port`; IPv6 with a port must be bracketed.
    pub nameservers: Vec<String>,
    pub record_types: Vec<RecordType>,
    pub timeout: Duration,
    /// Extra attempts per nameserver after the first one.
    pub retries: u32,
    pub max_cname_depth: usize,
}

impl Default for DnsSettings {
    fn default() -> Self {
        Self {
            nameservers: DEFAULT_NAMESERVERS.iter().map(|s| s.to_string()).collect(),
            record_types: vec![RecordType::A, RecordType::Aaaa, RecordType::Cname],
            timeout: DEFAULT_DNS_TIMEOUT,
            retries: DEFAULT_DNS_RETRIES,
            max_cname_depth: DEFAULT_CNAME_DEPTH,
        }
    }
}

impl DnsSettings {
    pub fn nameserver_addrs(&self) -> Result<Vec<SocketAddr>, ConfigurationError> {
        if self.nameservers.is_empty() {
            return Err(ConfigurationError::NoNameservers);
        }
        self.nameservers.iter().map(|s| parse_nameserver(s)).collect()
    }
}

/// Parses "1.1.1.1", "1.1.1.1:5353", "2606:4700::1111" or "[2606:4700::1111]:53".
pub fn parse_nameserver(s: &str) -> Result<SocketAddr, ConfigurationError> {
    let trimmed: &str = s.trim();
    if let Ok(addr) = trimmed.parse::<SocketAddr>() {
        return Ok(addr);
    }
    trimmed
        .parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, DNS_PORT))
        .map_err(|_| ConfigurationError::InvalidNameserver(s.to_string()))
}

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub enabled: bool,
    pub timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Cohere,
    OpenAi,
}

impl ProviderKind {
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Cohere => "command-r7b-12-2024",
            ProviderKind::OpenAi => "gpt-4o-mini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Cohere => f.write_str("cohere"),
            ProviderKind::OpenAi => f.write_str("openai"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cohere" => Ok(ProviderKind::Cohere),
            "openai" => Ok(ProviderKind::OpenAi),
            _ => Err(ConfigurationError::UnknownProvider(s.to_string())),
        }
    }
}

#[derive(Clone)]
pub struct ScoringSettings {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub temperature: f32,
    /// Overrides the provider's default API endpoint.
    pub endpoint: Option<String>,
    /// Bypasses the network and scores with a deterministic heuristic.
    pub mock: bool,
    pub batch_size: usize,
    pub max_concurrency: usize,
    pub requests_per_window: u32,
    pub rate_window: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub request_timeout: Duration,
    pub fallback_score: u8,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Cohere,
            api_key: None,
            model: None,
            temperature: DEFAULT_TEMPERATURE,
            endpoint: None,
            mock: false,
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrency: DEFAULT_SCORING_CONCURRENCY,
            requests_per_window: DEFAULT_REQUESTS_PER_WINDOW,
            rate_window: DEFAULT_RATE_WINDOW,
            max_retries: DEFAULT_MAX_RETRIES,
            base_backoff: DEFAULT_BASE_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            fallback_score: DEFAULT_FALLBACK_SCORE,
        }
    }
}

// Hand-written so the credential never ends up in logs.
impl fmt::Debug for ScoringSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoringSettings")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("endpoint", &self.endpoint)
            .field("mock", &self.mock)
            .field("batch_size", &self.batch_size)
            .field("max_concurrency", &self.max_concurrency)
            .field("requests_per_window", &self.requests_per_window)
            .field("rate_window", &self.rate_window)
            .field("max_retries", &self.max_retries)
            .field("fallback_score", &self.fallback_score)
            .finish_non_exhaustive()
    }
}

impl ScoringSettings {
    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// The API key, rejecting empty values and the placeholder shipped in sample configs.
    pub fn credential(&self) -> Result<&str, ConfigurationError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() && !is_placeholder(key) => Ok(key),
            _ => Err(ConfigurationError::MissingCredential(self.provider.to_string())),
        }
    }

    pub fn fallback(&self) -> RiskScore {
        RiskScore::saturating(i64::from(self.fallback_score))
    }
}

fn is_placeholder(key: &str) -> bool {
    matches!(key, "YOUR_API_KEY" | "YOUR_API_KEY_HERE")
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub domain: Domain,
    pub wordlist: Option<PathBuf>,
    pub threads: usize,
    pub limit: SubdomainLimit,
    pub dns: DnsSettings,
    pub probe: ProbeSettings,
    pub scoring: ScoringSettings,
    pub tiers: TierBoundaries,
}

impl ScanConfig {
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            wordlist: None,
            threads: DEFAULT_THREADS,
            limit: SubdomainLimit::default(),
            dns: DnsSettings::default(),
            probe: ProbeSettings::default(),
            scoring: ScoringSettings::default(),
            tiers: TierBoundaries::default(),
        }
    }

    /// Checks every setting that would otherwise fail halfway through a scan.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |name: &'static str, reason: &str| ConfigurationError::InvalidSetting {
            name,
            reason: reason.to_string(),
        };

        if self.threads == 0 {
            return Err(invalid("threads", "must be a positive integer"));
        }
        if self.limit == SubdomainLimit::Capped(0) {
            return Err(invalid("limit", "must be a positive integer"));
        }
        if self.dns.timeout.is_zero() {
            return Err(invalid("dns timeout", "must be positive"));
        }
        if self.dns.record_types.is_empty() {
            return Err(invalid("record types", "at least one is required"));
        }
        self.dns.nameserver_addrs()?;

        if self.probe.enabled && self.probe.timeout.is_zero() {
            return Err(invalid("probe timeout", "must be positive"));
        }

        let scoring = &self.scoring;
        if scoring.batch_size == 0 {
            return Err(invalid("batch size", "must be a positive integer"));
        }
        if scoring.max_concurrency == 0 {
            return Err(invalid("scoring concurrency", "must be a positive integer"));
        }
        if scoring.requests_per_window == 0 || scoring.rate_window.is_zero() {
            return Err(invalid("rate limit", "must allow at least one request"));
        }
        if !(0.0..=2.0).contains(&scoring.temperature) {
            return Err(invalid("temperature", "must be between 0.0 and 2.0"));
        }
        if RiskScore::new(i64::from(scoring.fallback_score)).is_none() {
            return Err(invalid("fallback score", "must be between 0 and 10"));
        }
        if !scoring.mock {
            scoring.credential()?;
        }

        if !self.tiers.is_valid() {
            return Err(invalid("tiers", "need medium <= high <= 10"));
        }
        Ok(())
    }
}
