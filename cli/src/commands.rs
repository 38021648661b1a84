pub mod scan;

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use subrank_common::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_DNS_RETRIES, DEFAULT_SUBDOMAIN_LIMIT, DEFAULT_TEMPERATURE,
    DEFAULT_THREADS, ProviderKind, ScanConfig, SubdomainLimit,
};
use subrank_common::error::ConfigurationError;
use subrank_common::target::Domain;

#[derive(Parser, Debug)]
#[command(name = "subrank", version)]
#[command(about = "Subdomain discovery with AI-assisted risk ranking.")]
#[command(after_help = "Examples:
  subrank -d example.com
  subrank -d example.com -w wordlist.txt -t 30 --http-check
  subrank -d example.com --test")]
pub struct CommandLine {
    /// Target domain to enumerate
    #[arg(short, long)]
    pub domain: Domain,

    /// Wordlist merged in front of the built-in labels
    #[arg(short, long)]
    pub wordlist: Option<PathBuf>,

    /// Concurrent resolver workers
    #[arg(short, long, default_value_t = DEFAULT_THREADS)]
    pub threads: usize,

    /// Stop after this many live subdomains
    #[arg(long, default_value_t = DEFAULT_SUBDOMAIN_LIMIT)]
    pub limit: usize,

    /// Collect every live subdomain
    #[arg(long, conflicts_with = "limit")]
    pub no_limit: bool,

    /// Score with the offline keyword heuristic instead of a model
    #[arg(long)]
    pub test: bool,

    /// AI provider (cohere, openai)
    #[arg(long, default_value = "cohere")]
    pub provider: ProviderKind,

    /// Model name, defaults to the provider's recommended model
    #[arg(long)]
    pub model: Option<String>,

    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Base URL of an alternative provider endpoint
    #[arg(long, env = "SUBRANK_API_ENDPOINT")]
    pub endpoint: Option<String>,

    #[arg(long, env = "SUBRANK_COHERE_KEY", hide_env_values = true)]
    pub cohere_key: Option<String>,

    #[arg(long, env = "SUBRANK_OPENAI_KEY", hide_env_values = true)]
    pub openai_key: Option<String>,

    /// Confirm live hosts over HTTPS/HTTP
    #[arg(long)]
    pub http_check: bool,

    /// DNS query timeout in seconds
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds, default_value = "1")]
    pub timeout: Duration,

    /// HTTP probe timeout in seconds
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds, default_value = "5")]
    pub probe_timeout: Duration,

    /// Extra attempts per nameserver on timeout or SERVFAIL
    #[arg(long, default_value_t = DEFAULT_DNS_RETRIES)]
    pub retries: u32,

    /// Nameserver to query, repeatable; replaces the public defaults
    #[arg(long = "nameserver", value_name = "IP[:PORT]")]
    pub nameservers: Vec<String>,

    /// Subdomains per AI request
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Score given to subdomains the model could not score
    #[arg(long, default_value_t = 0)]
    pub fallback_score: u8,

    /// Entries shown in the ranking
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// JSON output path (default: results/<domain>_<stamp>_ranked.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Less output; repeat to print only the ranking
    #[arg(short, long, action = ArgAction::Count)]
    pub quiet: u8,

    /// More logging; repeat for trace output
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Maps the flags onto a validated [`ScanConfig`].
    pub fn to_config(&self) -> Result<ScanConfig, ConfigurationError> {
        let mut config = ScanConfig::new(self.domain.clone());
        config.wordlist = self.wordlist.clone();
        config.threads = self.threads;
        config.limit = if self.no_limit {
            SubdomainLimit::Unlimited
        } else {
            SubdomainLimit::Capped(self.limit)
        };

        config.dns.timeout = self.timeout;
        config.dns.retries = self.retries;
        if !self.nameservers.is_empty() {
            config.dns.nameservers = self.nameservers.clone();
        }

        config.probe.enabled = self.http_check;
        config.probe.timeout = self.probe_timeout;

        let scoring = &mut config.scoring;
        scoring.provider = self.provider;
        scoring.mock = self.test;
        scoring.model = self.model.clone();
        scoring.temperature = self.temperature;
        scoring.endpoint = self.endpoint.clone();
        scoring.batch_size = self.batch_size;
        scoring.fallback_score = self.fallback_score;
        scoring.api_key = match self.provider {
            ProviderKind::Cohere => self.cohere_key.clone(),
            ProviderKind::OpenAi => self.openai_key.clone(),
        };

        config.validate()?;
        Ok(config)
    }
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let seconds: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a number of seconds"))?;
    Duration::try_from_secs_f64(seconds)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| format!("'{s}' must be a positive number of seconds"))
}
