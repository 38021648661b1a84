//! # Scan Target Model
//!
//! Defines the domain a scan is run against.
//!
//! A target is accepted when it is a syntactically plausible hostname:
//! * at least two labels (e.g., `example.com`).
//! * labels of 1 to 63 characters made of letters, digits and hyphens.
//! * no label starting or ending with a hyphen.
//! * a top-level label that is not purely numeric (rules out bare IPv4).
//!
//! Scheme prefixes and a trailing dot are tolerated and stripped.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;

const MAX_NAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// A validated, lowercase target domain.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Domain(String);

impl Domain {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Joins a candidate label onto this domain.
    pub fn with_label(&self, label: &str) -> String {
        format!("{label}.{}", self.0)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Domain {
    type Err = ConfigurationError;

    /// Parses a string into a `Domain`.
    ///
    /// Supported formats:
    /// * **Bare**: "example.com", "Example.COM." (normalized to lowercase, dot stripped).
    /// * **URL-ish**: "https://example.com/" (scheme and path are dropped).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = strip_decorations(s).to_ascii_lowercase();
        let invalid = |reason: &'static str| ConfigurationError::InvalidDomain {
            input: s.to_string(),
            reason,
        };

        if normalized.is_empty() {
            return Err(invalid("empty"));
        }
        if normalized.len() > MAX_NAME_LEN {
            return Err(invalid("longer than 253 characters"));
        }

        let labels: Vec<&str> = normalized.split('.').collect();
        if labels.len() < 2 {
            return Err(invalid("needs at least two labels"));
        }

        for label in &labels {
            validate_label(label).map_err(invalid)?;
        }

        let tld: &str = labels[labels.len() - 1];
        if tld.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("top-level label is numeric"));
        }

        Ok(Domain(normalized))
    }
}

fn strip_decorations(s: &str) -> &str {
    let trimmed: &str = s.trim();
    let without_scheme: &str = trimmed
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);
    let host: &str = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(without_scheme);
    host.strip_suffix('.').unwrap_or(host)
}

fn validate_label(label: &str) -> Result<(), &'static str> {
    if label.is_empty() {
        return Err("contains an empty label");
    }
    if label.len() > MAX_LABEL_LEN {
        return Err("label longer than 63 characters");
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err("label starts or ends with a hyphen");
    }
    if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err("label contains invalid characters");
    }
    Ok(())
}
