//! HTTP client with retry and rate limiting
//!
//! Provides the transport used by page sources. It handles:
//! - Automatic retries with configurable backoff
//! - Rate limiting to prevent API throttling
//! - Error classification so callers can tell transient from fatal failures
//!
//! Retries here are the first line of defence. Once they are exhausted the
//! error surfaces as a retryable [`Error`] and the page fetcher takes over by
//! shrinking the request.

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::error::{is_retryable_status, Error, Result};
use crate::types::{BackoffType, StringMap};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL for all requests
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of retries
    pub max_retries: u32,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Default headers for all requests
    pub default_headers: StringMap,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
            rate_limit: Some(RateLimiterConfig::default()),
            default_headers: StringMap::new(),
            user_agent: format!("solidafy-extract/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.backoff_type = backoff_type;
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Query string and body of one page request
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Query parameters, in insertion order
    pub query: Vec<(String, String)>,
    /// Request body (JSON)
    pub body: Option<Value>,
}

impl RequestConfig {
    /// Create an empty request
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Verdict on one attempt
enum Attempt {
    Done(Response),
    Retry { error: Error, delay: Duration },
    Fail(Error),
}

/// HTTP client with retry and rate limiting
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a client from configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;
        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    /// Send a request and parse the JSON body
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        request: &RequestConfig,
    ) -> Result<T> {
        let response = self.send(method, path, request).await?;
        Ok(response.json().await?)
    }

    /// Send a request, retrying transient failures up to `max_retries` times
    ///
    /// The error of the last attempt is returned once retries run out, still
    /// classified, so the caller can decide whether to shrink the request.
    pub async fn send(&self, method: Method, path: &str, request: &RequestConfig) -> Result<Response> {
        let url = self.build_url(path);
        let mut attempt = 0;

        loop {
            if let Some(limiter) = &self.rate_limiter {
                limiter.wait().await;
            }

            let result = self.prepare(method.clone(), &url, request).send().await;
            match self.classify(result, attempt).await {
                Attempt::Done(response) => {
                    debug!("{method} {url}: {}", response.status());
                    return Ok(response);
                }
                Attempt::Fail(error) => return Err(error),
                Attempt::Retry { error, delay } => {
                    warn!(
                        "{method} {url} failed, attempt {}/{}, retrying in {delay:?}: {error}",
                        attempt + 1,
                        self.config.max_retries + 1
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn prepare(&self, method: Method, url: &str, request: &RequestConfig) -> RequestBuilder {
        let mut builder = self.client.request(method, url);
        for (key, value) in &self.config.default_headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder
    }

    async fn classify(&self, result: reqwest::Result<Response>, attempt: u32) -> Attempt {
        let can_retry = attempt < self.config.max_retries;
        let backoff = self.calculate_backoff(attempt);

        let response = match result {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                let error = Error::Timeout {
                    timeout_ms: self.config.timeout.as_millis() as u64,
                };
                return if can_retry {
                    Attempt::Retry {
                        error,
                        delay: backoff,
                    }
                } else {
                    Attempt::Fail(error)
                };
            }
            Err(e) if e.is_connect() && can_retry => {
                return Attempt::Retry {
                    error: Error::Http(e),
                    delay: backoff,
                }
            }
            Err(e) => return Attempt::Fail(Error::Http(e)),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = extract_retry_after(&response);
            let error = Error::RateLimited {
                retry_after_seconds: retry_after,
            };
            return if can_retry {
                Attempt::Retry {
                    error,
                    delay: Duration::from_secs(retry_after).min(self.config.max_backoff),
                }
            } else {
                Attempt::Fail(error)
            };
        }

        if !status.is_client_error() && !status.is_server_error() {
            return Attempt::Done(response);
        }

        let code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        let error = Error::http_status(code, body);
        if can_retry && is_retryable_status(code) {
            Attempt::Retry {
                error,
                delay: backoff,
            }
        } else {
            Attempt::Fail(error)
        }
    }

    /// Build full URL from path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.config.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = path.trim_start_matches('/');
                format!("{base}/{path}")
            }
            None => path.to_string(),
        }
    }

    /// Backoff delay before retry number `attempt + 1`
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.config.backoff_type {
            BackoffType::Constant => self.config.initial_backoff,
            BackoffType::Linear => self.config.initial_backoff * (attempt + 1),
            BackoffType::Exponential => self
                .config
                .initial_backoff
                .saturating_mul(2u32.saturating_pow(attempt)),
        };
        delay.min(self.config.max_backoff)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("rate_limited", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Seconds from a `Retry-After` header, 60 if absent or unparseable
fn extract_retry_after(response: &Response) -> u64 {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(60)
}
