use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use subrank_common::config::{ProviderKind, ScoringSettings};
use subrank_common::error::ConfigurationError;
use thiserror::Error;

use super::cohere::CohereProvider;
use super::mock::MockProvider;
use super::openai::OpenAiProvider;

/// One batch of names sent to a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRequest {
    pub domain: String,
    pub names: Vec<String>,
    pub model: String,
    pub temperature: f32,
}

/// Classification of a single failed provider call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("rate limited by provider")]
    RateLimited { retry_after: Option<Duration> },

    #[error("credential rejected (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("provider unreachable: {0}")]
    Unreachable(String),

    #[error("provider server error (HTTP {status})")]
    Server { status: u16 },

    #[error("unexpected HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("failed to decode provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Rate limits, transport errors and 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Unreachable(_) | Self::Server { .. }
        )
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Maps a non-success response onto the taxonomy.
    pub async fn from_response(response: Response) -> Self {
        let status: StatusCode = response.status();
        let retry_after: Option<Duration> = parse_retry_after(response.headers());
        let body: String = response.text().await.unwrap_or_default();

        match status.as_u16() {
            429 => Self::RateLimited { retry_after },
            401 | 403 => Self::Unauthorized {
                status: status.as_u16(),
            },
            code if status.is_server_error() => Self::Server { status: code },
            code => Self::Http {
                status: code,
                body: truncate(&body, 200),
            },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Decode(e.to_string())
        } else {
            ProviderError::Unreachable(e.to_string())
        }
    }
}

/// A backend able to score a batch of subdomain names.
///
/// Implementations only move text: they return the model's raw reply and
/// leave parsing and validation to the scorer.
#[async_trait]
pub trait ScoringProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn score_batch(&self, request: &ScoreRequest) -> Result<String, ProviderError>;
}

/// Creates the provider selected by the settings.
pub fn create_provider(
    settings: &ScoringSettings,
) -> Result<Arc<dyn ScoringProvider>, ConfigurationError> {
    if settings.mock {
        return Ok(Arc::new(MockProvider::new()));
    }

    let api_key: String = settings.credential()?.to_string();
    let endpoint: Option<String> = settings.endpoint.clone();

    match settings.provider {
        ProviderKind::Cohere => Ok(Arc::new(CohereProvider::new(
            api_key,
            endpoint,
            settings.request_timeout,
        )?)),
        ProviderKind::OpenAi => Ok(Arc::new(OpenAiProvider::new(
            api_key,
            endpoint,
            settings.request_timeout,
        )?)),
    }
}

pub(super) fn http_client(timeout: Duration) -> Result<reqwest::Client, ConfigurationError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ConfigurationError::Initialization {
            component: "scoring provider",
            reason: e.to_string(),
        })
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
