use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use std::time::Duration;
use tokio_retry::{strategy::FixedInterval, Retry};

use super::types::QueryResponse;
use crate::config::FetchConfig;

const WIKISOURCE_API: &str = "https://{lang}.wikisource.org/w/api.php";
const OLDWIKISOURCE_API: &str = "https://wikisource.org/w/api.php";
pub const COMMONS_API: &str = "https://commons.wikimedia.org/w/api.php";

/// Language prefixes served by the multilingual wikisource.org.
const OLDWIKISOURCE_PREFIXES: [&str; 4] = ["old", "oldwikisource", "www", ""];

/// API endpoint for a Wikisource language subdomain.
pub fn wikisource_api(lang: &str) -> String {
    let lang = lang.trim();
    if OLDWIKISOURCE_PREFIXES.contains(&lang) {
        OLDWIKISOURCE_API.to_string()
    } else {
        WIKISOURCE_API.replace("{lang}", lang)
    }
}

/// How often and how patiently a request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: usize,
    /// Pause between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(fetch: &FetchConfig) -> Self {
        Self {
            attempts: fetch.max_retries(),
            delay: fetch.retry_delay(),
        }
    }
}

/// Create the HTTP client shared by every API endpoint
pub fn create_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(concat!("wscontest/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

/// MediaWiki Action API endpoint with a retry policy.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(http: Client, endpoint: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            retry,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST an `action=query` request, retrying transport and decoding
    /// failures with a fixed pause. API-level errors are not retried.
    pub async fn query(&self, params: &[(&str, String)]) -> Result<QueryResponse> {
        let strategy = FixedInterval::new(self.retry.delay).take(self.retry.attempts.saturating_sub(1));

        let response = Retry::start(strategy, move || async move {
            let result = self
                .http
                .post(&self.endpoint)
                .form(params)
                .send()
                .await
                .and_then(|r| r.error_for_status());

            let result = match result {
                Ok(r) => r.json::<QueryResponse>().await,
                Err(e) => Err(e),
            };

            result.map_err(|e| {
                tracing::debug!(endpoint = %self.endpoint, "request failed, retrying: {}", e);
                if e.is_timeout() {
                    anyhow!("Request to {} timed out", self.endpoint)
                } else if e.is_decode() {
                    anyhow!("Unexpected response from {}: {}", self.endpoint, e)
                } else {
                    anyhow!("API error from {}: {}", self.endpoint, e)
                }
            })
        })
        .await
        .with_context(|| format!("Giving up after {} attempts", self.retry.attempts))?;

        if let Some(error) = &response.error {
            anyhow::bail!("MediaWiki API error '{}': {}", error.code, error.info);
        }

        Ok(response)
    }
}
