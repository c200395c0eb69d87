//! Metrics source trait and HTTP implementation
//!
//! The poll loop only depends on [`MetricsSource`]; the HTTP client fetches the
//! raw exposition body from the configured endpoint.

use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Transport-level failure while fetching the exposition body
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status { url: String, status: StatusCode },
}

impl FetchError {
    /// Short stable label for logs and statistics
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout { .. } => "timeout",
            FetchError::Transport { .. } => "transport",
            FetchError::Status { .. } => "http_status",
        }
    }
}

/// Source of raw exposition bodies - implement this to feed the poll loop
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Fetch one exposition body
    async fn fetch(&self) -> Result<String, FetchError>;
}

/// HTTP metrics client - GETs the exposition from a metrics endpoint
pub struct HttpMetricsClient {
    url: String,
    token: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpMetricsClient {
    /// Create a new HTTP metrics client
    pub fn new(url: String, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            url,
            token: token.filter(|t| !t.is_empty()),
            timeout,
            client,
        })
    }

    /// Create a client for the endpoint described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.endpoint_url(),
            config.bearer_token().map(str::to_string),
            config.request_timeout(),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn transport_error(&self, source: reqwest::Error) -> FetchError {
        if source.is_timeout() {
            FetchError::Timeout {
                url: self.url.clone(),
                timeout: self.timeout,
            }
        } else {
            FetchError::Transport {
                url: self.url.clone(),
                source,
            }
        }
    }
}

#[async_trait]
impl MetricsSource for HttpMetricsClient {
    async fn fetch(&self) -> Result<String, FetchError> {
        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        debug!(url = %self.url, bytes = body.len(), "Fetched metrics body");
        Ok(body)
    }
}
