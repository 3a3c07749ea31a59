//! HTTP transport
//!
//! A thin client over `reqwest` that issues a single API request and retries
//! transient gateway failures with capped exponential backoff.

mod client;

pub use client::{
    HttpClient, HttpClientConfig, HttpClientConfigBuilder, RetryConfig, DEFAULT_BASE_URL,
    MAX_RETRIES,
};
