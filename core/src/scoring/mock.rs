use async_trait::async_trait;
use serde_json::json;

use super::provider::{ProviderError, ScoreRequest, ScoringProvider};

const DEFAULT_SCORE: u8 = 5;
const DEFAULT_REASON: &str = "Standard subdomain with moderate security relevance";

/// Keyword groups checked in order; the first hit decides the score.
const RULES: &[(&[&str], u8, &str)] = &[
    (
        &["admin", "dashboard", "manage", "control"],
        9,
        "Administrative interface with potential access to sensitive controls",
    ),
    (
        &["api", "service", "rest", "graphql"],
        8,
        "API endpoint that may contain security vulnerabilities",
    ),
    (
        &["dev", "staging", "test", "uat"],
        7,
        "Development/testing environment that may have less security",
    ),
    (
        &["db", "database", "sql", "mongo"],
        9,
        "Database-related subdomain with high data sensitivity",
    ),
    (
        &["vpn", "remote", "connect"],
        8,
        "Network access point that could provide entry to internal systems",
    ),
    (
        &["storage", "s3", "file", "cdn"],
        6,
        "Storage service that may contain sensitive files or data",
    ),
    (
        &["auth", "login", "account"],
        7,
        "Authentication-related endpoint with potential security implications",
    ),
];

/// Offline stand-in for a model. Scores by keyword and replies with the same
/// JSON a real model is asked to produce.
#[derive(Debug, Default)]
pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }
}

/// Keyword heuristic applied to the part of `name` left of `domain`.
pub fn heuristic(name: &str, domain: &str) -> (u8, &'static str) {
    let name: String = name.to_ascii_lowercase();
    let label: &str = name
        .strip_suffix(domain)
        .map(|rest| rest.trim_end_matches('.'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(&name);

    RULES
        .iter()
        .find(|(keywords, _, _)| keywords.iter().any(|k| label.contains(k)))
        .map(|(_, score, reason)| (*score, *reason))
        .unwrap_or((DEFAULT_SCORE, DEFAULT_REASON))
}

#[async_trait]
impl ScoringProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn score_batch(&self, request: &ScoreRequest) -> Result<String, ProviderError> {
        let entries: Vec<serde_json::Value> = request
            .names
            .iter()
            .map(|name| {
                let (score, reason) = heuristic(name, &request.domain);
                json!({ "subdomain": name, "score": score, "reason": reason })
            })
            .collect();

        serde_json::to_string_pretty(&entries).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_rule_wins() {
        assert_eq!(heuristic("admin.example.com", "example.com").0, 9);
        assert_eq!(heuristic("api-dev.example.com", "example.com").0, 8);
        assert_eq!(heuristic("staging.example.com", "example.com").0, 7);
        assert_eq!(heuristic("cdn.example.com", "example.com").0, 6);
        assert_eq!(heuristic("www.example.com", "example.com"), (5, DEFAULT_REASON));
    }

    #[test]
    fn domain_keywords_do_not_leak_into_labels() {
        assert_eq!(heuristic("www.testcorp.io", "testcorp.io").0, 5);
        assert_eq!(heuristic("dev.testcorp.io", "testcorp.io").0, 7);
    }

    #[tokio::test]
    async fn replies_with_scoring_json() {
        let request = ScoreRequest {
            domain: "example.com".into(),
            names: vec!["www.example.com".into(), "admin.example.com".into()],
            model: "mock".into(),
            temperature: 0.0,
        };

        let first = MockProvider::new().score_batch(&request).await.unwrap();
        let second = MockProvider::new().score_batch(&request).await.unwrap();
        assert_eq!(first, second);

        let value: serde_json::Value = serde_json::from_str(&first).unwrap();
        assert_eq!(value[0]["subdomain"], "www.example.com");
        assert_eq!(value[0]["score"], 5);
        assert_eq!(value[1]["score"], 9);
    }
}
