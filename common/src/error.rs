//! # Error Taxonomy
//!
//! Only [`ConfigurationError`] stops a scan before it starts. Everything else is
//! absorbed by the stage that produced it:
//!
//! * [`ResolutionFailure`] turns into the absence of a candidate from the live set.
//! * [`ScoringFailure`] degrades a subdomain to the fallback score.
//! * [`FatalScoringError`] is reported once, while discovery results are kept.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("wordlist not found: {}", .0.display())]
    WordlistMissing(PathBuf),

    #[error("wordlist {} contains no usable entries", .0.display())]
    WordlistEmpty(PathBuf),

    #[error("failed to read wordlist {}: {source}", path.display())]
    WordlistUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid nameserver address '{0}'")]
    InvalidNameserver(String),

    #[error("no nameservers configured")]
    NoNameservers,

    #[error("no API credential configured for the {0} provider")]
    MissingCredential(String),

    #[error("unknown AI provider '{0}'")]
    UnknownProvider(String),

    #[error("invalid domain '{input}': {reason}")]
    InvalidDomain { input: String, reason: &'static str },

    #[error("invalid value for {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("failed to initialise {component}: {reason}")]
    Initialization {
        component: &'static str,
        reason: String,
    },

    #[error("no candidates to enumerate")]
    NoCandidates,
}

/// Why a single candidate did not make it into the live set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionFailure {
    #[error("query timed out")]
    Timeout,

    #[error("nameserver reported a server failure")]
    ServerFailure,

    #[error("nameserver refused the query")]
    Refused,

    #[error("malformed reply: {0}")]
    Malformed(String),

    #[error("i/o error: {0}")]
    Io(String),
}

impl ResolutionFailure {
    /// Timeouts and SERVFAIL are worth asking the same nameserver again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::ServerFailure)
    }
}

/// A scoring problem that only affects the subdomains of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringFailure {
    #[error("rate limited after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },

    #[error("provider failed after {attempts} attempts: {reason}")]
    RetriesExhausted { attempts: u32, reason: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("no score returned for {name}")]
    MissingEntry { name: String },

    #[error("invalid score for {name}: {reason}")]
    InvalidEntry { name: String, reason: String },

    #[error("scan cancelled before scoring")]
    Cancelled,

    #[error("provider unavailable")]
    ProviderUnavailable,
}

impl ScoringFailure {
    /// Reasoning text attached to a subdomain that fell back to the default score.
    pub fn fallback_reason(&self) -> String {
        format!("scoring unavailable: {self}")
    }
}

/// A provider problem that makes every further request pointless.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalScoringError {
    #[error("provider rejected the credential (HTTP {status})")]
    CredentialRejected { status: u16 },

    #[error("provider unreachable after {attempts} attempts: {reason}")]
    ProviderUnreachable { attempts: u32, reason: String },
}
