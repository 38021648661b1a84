use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use subrank_common::error::ConfigurationError;

use super::prompt::build_prompt;
use super::provider::{ProviderError, ScoreRequest, ScoringProvider, http_client};

const COHERE_API_BASE: &str = "https://api.cohere.com";
const CHAT_PATH: &str = "/v1/chat";

pub struct CohereProvider {
    client: Client,
    api_key: String,
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    message: String,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    text: String,
}

impl CohereProvider {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        let base: String = base_url.unwrap_or_else(|| COHERE_API_BASE.to_string());
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            url: format!("{}{CHAT_PATH}", base.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ScoringProvider for CohereProvider {
    fn name(&self) -> &'static str {
        "cohere"
    }

    async fn score_batch(&self, request: &ScoreRequest) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &request.model,
            message: build_prompt(&request.domain, &request.names),
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        let reply: ChatResponse = response.json().await?;
        Ok(reply.text)
    }
}
