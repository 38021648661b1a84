use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use subrank_common::error::ConfigurationError;

use super::prompt::{SYSTEM_PROMPT, build_prompt};
use super::provider::{ProviderError, ScoreRequest, ScoringProvider, http_client};

const OPENAI_API_BASE: &str = "https://api.openai.com";
const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// OpenAI chat completions, also usable with compatible servers via the
/// endpoint override.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    url: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        let base: String = base_url.unwrap_or_else(|| OPENAI_API_BASE.to_string());
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            url: format!("{}{COMPLETIONS_PATH}", base.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ScoringProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn score_batch(&self, request: &ScoreRequest) -> Result<String, ProviderError> {
        let body = CompletionRequest {
            model: &request.model,
            temperature: request.temperature,
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: build_prompt(&request.domain, &request.names),
                },
            ],
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

        let reply: CompletionResponse = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Decode("response contained no choices".into()))
    }
}
