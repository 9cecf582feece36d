//! HTTP session used by the raw layer
//!
//! Every request carries the crate user agent and its own timeout.
//! Rate limits (429), server errors, timeouts and refused connections are
//! retried with backoff; any other client error fails on the first try.

use crate::error::{Error, Result};
use crate::types::BackoffType;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Session-wide settings
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Timeout applied when a request does not set its own
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
    pub backoff_type: BackoffType,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
            user_agent: format!("collision-etl/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for [`HttpClientConfig`]
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.backoff_type = backoff_type;
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Per-request overrides
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// GET-only client with retry and backoff
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client, config })
    }

    /// GET `url`, returning the response once its status is a success
    ///
    /// The returned response has not been read yet, so callers can stream
    /// the body. The request timeout covers connecting and the response
    /// headers.
    pub async fn get(&self, url: &str, options: RequestOptions) -> Result<Response> {
        let max_retries = self.config.max_retries;
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let mut attempt = 0;

        loop {
            let (error, delay) = match self.client.get(url).timeout(timeout).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("GET {} -> {}", url, response.status());
                    return Ok(response);
                }
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let delay = retry_after(&response).map_or_else(
                        || self.calculate_backoff(attempt),
                        |d| d.min(self.config.max_backoff),
                    );
                    let error = Error::RateLimited {
                        retry_after_seconds: delay.as_secs(),
                    };
                    (error, delay)
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    (
                        Error::http_status(status, body),
                        self.calculate_backoff(attempt),
                    )
                }
                Err(e) if e.is_timeout() => (
                    Error::Timeout {
                        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    },
                    self.calculate_backoff(attempt),
                ),
                Err(e) if e.is_connect() => (Error::Http(e), self.calculate_backoff(attempt)),
                Err(e) => return Err(Error::Http(e)),
            };

            if !error.is_retryable() {
                return Err(error);
            }
            if attempt >= max_retries {
                warn!("Giving up on {} after {} attempts: {}", url, attempt + 1, error);
                return Err(error);
            }

            warn!(
                "GET {} failed ({}), attempt {}/{}, retrying in {:?}",
                url,
                error,
                attempt + 1,
                max_retries + 1,
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// GET `url` and decode the body as JSON
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let response = self.get(url, options).await?;
        Ok(response.json().await?)
    }

    /// Delay before retry number `attempt + 1`
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let initial = self.config.initial_backoff;
        let delay = match self.config.backoff_type {
            BackoffType::Constant => initial,
            BackoffType::Linear => initial.saturating_mul(attempt.saturating_add(1)),
            BackoffType::Exponential => initial.saturating_mul(2u32.saturating_pow(attempt)),
        };

        delay.min(self.config.max_backoff)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// `Retry-After` in whole seconds, if present
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
        .map(Duration::from_secs)
}
