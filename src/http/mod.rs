//! HTTP client module
//!
//! Provides the HTTP transport used by page sources.
//!
//! # Features
//!
//! - **Automatic Retries**: 429/5xx, timeouts and connect errors retried with backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Backoff Strategies**: Constant, linear, and exponential backoff

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

#[cfg(test)]
mod tests;
