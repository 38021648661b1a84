//! HTTP liveness check for resolved hosts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, redirect};
use subrank_common::config::ProbeSettings;
use subrank_common::error::ConfigurationError;
use subrank_common::models::{ProbeResult, Scheme};
use tracing::debug;

const USER_AGENT: &str = concat!("subrank/", env!("CARGO_PKG_VERSION"));

#[async_trait]
pub trait HttpProbe: Send + Sync {
    async fn probe(&self, host: &str) -> ProbeResult;
}

/// Tries HTTPS, then plain HTTP. Any status code counts as a response;
/// redirects are reported as-is, never followed.
///
/// Each scheme gets half of the budget so a hanging HTTPS attempt still
/// leaves room for HTTP; the full budget caps the probe as a whole.
pub struct ReqwestProbe {
    client: Client,
    timeout: Duration,
    per_scheme: Duration,
}

impl ReqwestProbe {
    pub fn new(settings: &ProbeSettings) -> Result<Self, ConfigurationError> {
        let per_scheme: Duration = settings.timeout / 2;
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(redirect::Policy::none())
            .connect_timeout(per_scheme)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ConfigurationError::Initialization {
                component: "http probe",
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            timeout: settings.timeout,
            per_scheme,
        })
    }

    async fn attempt(&self, host: &str, scheme: Scheme) -> Result<u16, reqwest::Error> {
        let url = format!("{scheme}://{host}/");
        let response = self.client.get(&url).timeout(self.per_scheme).send().await?;
        Ok(response.status().as_u16())
    }

    async fn probe_schemes(&self, host: &str) -> ProbeResult {
        let mut last_error: String = String::new();
        for scheme in [Scheme::Https, Scheme::Http] {
            match self.attempt(host, scheme).await {
                Ok(code) => return ProbeResult::responded(host, code, scheme),
                Err(e) => {
                    debug!("{scheme} probe of {host} failed: {e}");
                    last_error = e.to_string();
                }
            }
        }
        ProbeResult::unreachable(host, last_error)
    }
}

#[async_trait]
impl HttpProbe for ReqwestProbe {
    async fn probe(&self, host: &str) -> ProbeResult {
        match tokio::time::timeout(self.timeout, self.probe_schemes(host)).await {
            Ok(result) => result,
            Err(_) => ProbeResult::unreachable(host, "probe timed out"),
        }
    }
}
