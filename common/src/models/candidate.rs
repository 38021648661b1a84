use std::fmt;

use crate::target::Domain;

/// A subdomain label to be tested against the target domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Candidate(String);

impl Candidate {
    /// Normalizes a raw wordlist entry into a candidate.
    ///
    /// Returns `None` for blank entries and for labels containing characters
    /// that can never appear in a hostname.
    pub fn parse(raw: &str) -> Option<Self> {
        let label: String = raw.trim().trim_matches('.').to_ascii_lowercase();
        if label.is_empty() {
            return None;
        }

        let valid = label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        valid.then_some(Self(label))
    }

    pub fn label(&self) -> &str {
        &self.0
    }

    pub fn fqdn(&self, domain: &Domain) -> String {
        domain.with_label(&self.0)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
