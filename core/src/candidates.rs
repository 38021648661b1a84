//! # Candidate Source
//!
//! Produces the ordered list of labels the enumerator tries. User wordlist
//! entries come first, in file order; built-in labels follow unless the user
//! already listed them.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use subrank_common::error::ConfigurationError;
use subrank_common::models::Candidate;
use tracing::{debug, info};

/// Labels worth trying against any domain.
pub const BUILTIN_LABELS: &[&str] = &[
    "www", "api", "admin", "dev", "staging", "test", "qa", "uat",
    "mail", "smtp", "pop", "imap", "webmail", "mx",
    "ftp", "sftp", "ssh",
    "vpn", "remote", "access", "gateway", "proxy",
    "blog", "forum", "shop", "store",
    "cdn", "static", "assets", "media", "images",
    "m", "mobile", "app",
    "portal", "dashboard", "panel", "manage", "control",
    "beta", "alpha", "demo",
    "git", "gitlab", "jenkins", "ci",
    "jira", "confluence", "wiki",
    "status", "monitor", "metrics", "grafana", "kibana",
    "db", "database", "mysql", "postgres", "mongo", "redis",
    "backup", "old", "legacy",
    "v1", "v2", "graphql", "rest",
    "docs", "help", "support",
    "secure", "login", "auth", "sso", "account",
    "payment", "pay", "checkout",
    "internal", "intranet", "corp",
    "storage", "s3", "files", "upload",
    "ns1", "ns2", "autodiscover",
];

#[derive(Debug, Clone)]
pub struct CandidateSource {
    builtin: Vec<Candidate>,
}

impl Default for CandidateSource {
    fn default() -> Self {
        Self::with_builtin(BUILTIN_LABELS)
    }
}

impl CandidateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin(labels: &[&str]) -> Self {
        Self {
            builtin: labels.iter().filter_map(|l| Candidate::parse(l)).collect(),
        }
    }

    /// Merges the optional user wordlist with the built-in labels.
    pub fn load(&self, wordlist: Option<&Path>) -> Result<Vec<Candidate>, ConfigurationError> {
        let user: Vec<Candidate> = match wordlist {
            Some(path) => {
                let entries = read_wordlist(path)?;
                info!("Loaded {} words from {}", entries.len(), path.display());
                entries
            }
            None => Vec::new(),
        };

        let merged: Vec<Candidate> = merge(user, &self.builtin);
        if merged.is_empty() {
            return Err(ConfigurationError::NoCandidates);
        }
        Ok(merged)
    }
}

/// Reads a wordlist, skipping blank lines and `#` comments.
pub fn read_wordlist(path: &Path) -> Result<Vec<Candidate>, ConfigurationError> {
    let content: String = fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ConfigurationError::WordlistMissing(path.to_path_buf()),
        _ => ConfigurationError::WordlistUnreadable {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let candidates: Vec<Candidate> = parse_wordlist(&content);
    if candidates.is_empty() {
        return Err(ConfigurationError::WordlistEmpty(path.to_path_buf()));
    }
    Ok(candidates)
}

fn parse_wordlist(content: &str) -> Vec<Candidate> {
    let mut seen: HashSet<Candidate> = HashSet::new();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let candidate = Candidate::parse(line);
            if candidate.is_none() {
                debug!("Skipping invalid wordlist entry '{line}'");
            }
            candidate
        })
        .filter(|candidate| seen.insert(candidate.clone()))
        .collect()
}

fn merge(user: Vec<Candidate>, builtin: &[Candidate]) -> Vec<Candidate> {
    let mut seen: HashSet<Candidate> = user.iter().cloned().collect();
    let mut merged: Vec<Candidate> = user;
    for candidate in builtin {
        if seen.insert(candidate.clone()) {
            merged.push(candidate.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn wordlist(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn labels(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(Candidate::label).collect()
    }

    #[test]
    fn builtin_only_without_wordlist() {
        let source = CandidateSource::with_builtin(&["www", "api"]);
        let candidates = source.load(None).unwrap();
        assert_eq!(labels(&candidates), vec!["www", "api"]);
    }

    #[test]
    fn user_entries_first_and_deduplicated() {
        let file = wordlist("# custom list\nadmin\n\nWWW\nadmin\n  vpn  \n");
        let source = CandidateSource::with_builtin(&["www", "api", "vpn", "mail"]);

        let candidates = source.load(Some(file.path())).unwrap();
        assert_eq!(labels(&candidates), vec!["admin", "www", "vpn", "api", "mail"]);
    }

    #[test]
    fn missing_wordlist_is_a_configuration_error() {
        let source = CandidateSource::new();
        let err = source
            .load(Some(Path::new("/definitely/not/here.txt")))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::WordlistMissing(_)));
    }

    #[test]
    fn empty_wordlist_is_a_configuration_error() {
        let file = wordlist("\n   \n# only comments\n");
        let err = CandidateSource::new().load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigurationError::WordlistEmpty(_)));
    }

    #[test]
    fn invalid_entries_are_skipped() {
        let file = wordlist("good\nbad entry\nalso/bad\n");
        let candidates = read_wordlist(file.path()).unwrap();
        assert_eq!(labels(&candidates), vec!["good"]);
    }

    #[test]
    fn no_candidates_at_all() {
        let source = CandidateSource::with_builtin(&[]);
        assert!(matches!(source.load(None), Err(ConfigurationError::NoCandidates)));
    }
}
