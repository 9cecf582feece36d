//! HTTP client module
//!
//! Provides the HTTP session the raw layer fetches sources through.
//!
//! # Features
//!
//! - **Automatic Retries**: 429, 5xx, timeouts and connection errors
//! - **Backoff Strategies**: Constant, linear, and exponential backoff
//! - **Timeouts**: session default with per-request overrides

mod client;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestOptions};

#[cfg(test)]
mod tests;
