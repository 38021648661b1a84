use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use subrank_common::error::FatalScoringError;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::{StaticResolver, config, pipeline};

const RECORDS: &[(&str, &str)] = &[
    ("api.example.com", "10.0.0.1"),
    ("shop.example.com", "10.0.0.2"),
];

fn cohere_config(server: &MockServer) -> subrank_common::config::ScanConfig {
    let mut config = config("example.com");
    config.scoring.mock = false;
    config.scoring.api_key = Some("test-key".into());
    config.scoring.endpoint = Some(server.uri());
    config.scoring.max_retries = 1;
    config.scoring.base_backoff = Duration::from_millis(5);
    config.scoring.max_backoff = Duration::from_millis(20);
    config
}

#[tokio::test]
async fn model_scores_flow_into_the_ranking() {
    let server = MockServer::start().await;
    let reply = json!([
        {"subdomain": "shop.example.com", "score": 6, "reason": "Handles payments"},
        {"subdomain": "api.example.com", "score": 8, "reason": "Public API surface"}
    ]);
    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": format!("Here is the assessment:\n{reply}")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = cohere_config(&server);
    let report = pipeline(&config, &["api", "shop", "ghost"], Arc::new(StaticResolver::new(RECORDS)))
        .execute(&config)
        .await
        .unwrap();

    let ranked: Vec<(&str, u8)> = report
        .result
        .subdomains
        .iter()
        .map(|e| (e.name.as_str(), e.risk_score))
        .collect();
    assert_eq!(ranked, vec![("api.example.com", 8), ("shop.example.com", 6)]);
    assert_eq!(report.result.subdomains[0].reason, "Public API surface");
    assert!(report.fatal_scoring.is_none());
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn rejected_key_keeps_every_live_subdomain() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = cohere_config(&server);
    config.scoring.fallback_score = 3;
    let report = pipeline(&config, &["api", "shop"], Arc::new(StaticResolver::new(RECORDS)))
        .execute(&config)
        .await
        .unwrap();

    assert!(matches!(
        report.fatal_scoring,
        Some(FatalScoringError::CredentialRejected { status: 401 })
    ));
    assert_eq!(report.result.subdomains.len(), 2);
    assert!(report.result.subdomains.iter().all(|e| e.risk_score == 3));
    assert!(report.result.subdomains[0].reason.starts_with("scoring unavailable"));
}

#[tokio::test]
async fn missing_entries_fall_back_individually() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": r#"[{"subdomain": "api.example.com", "score": 7, "reason": "API"}]"#
        })))
        .mount(&server)
        .await;

    let config = cohere_config(&server);
    let report = pipeline(&config, &["api", "shop"], Arc::new(StaticResolver::new(RECORDS)))
        .execute(&config)
        .await
        .unwrap();

    assert!(report.fatal_scoring.is_none());
    assert_eq!(report.warnings.len(), 1);
    let shop = report
        .result
        .subdomains
        .iter()
        .find(|e| e.name == "shop.example.com")
        .unwrap();
    assert_eq!(shop.risk_score, 0);
}
