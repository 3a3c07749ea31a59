//! HTTP client with retry on transient statuses
//!
//! Handles:
//! - Automatic retries for 502/503/504 with capped exponential backoff
//! - Default headers (content type, client identifier) and bearer auth
//! - Response body parsing into JSON
//!
//! Anything other than the listed transient statuses fails on first sight;
//! connection-level errors are not retried.

use crate::error::{is_transient_status, Error, Result};
use crate::types::{JsonValue, Method};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default base URL of the MERMAID API
pub const DEFAULT_BASE_URL: &str = "https://api.datamermaid.org/v1";

/// Total attempt budget for one request against a transient failure
pub const MAX_RETRIES: u32 = 5;

/// Configuration for transient-failure retries
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts per request (first try included)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Ceiling for the exponential backoff
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL prepended to relative request paths
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Retry behavior for transient statuses
    pub retry: RetryConfig,
    /// Client identifier sent as the User-Agent header
    pub user_agent: String,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            user_agent: format!("marlin/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
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
        self.config.base_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set retry configuration
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set the client identifier
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// HTTP client issuing single API requests with transient-status retries
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Self {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self { client, config }
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Resolve a path against the configured base URL and validate the result
    pub fn absolute_url(&self, path: &str) -> Result<String> {
        let url = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!(
                "{}/{}",
                self.config.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        };
        Url::parse(&url)?;
        Ok(url)
    }

    /// Issue one API request and parse the JSON response body.
    ///
    /// Statuses 502/503/504 are retried up to the configured attempt budget
    /// with capped exponential backoff; any other non-2xx status fails
    /// immediately with the status code and response body text. Caller
    /// headers override defaults on key collision.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        params: &[(String, String)],
        payload: Option<&JsonValue>,
        headers: &HashMap<String, String>,
        token: Option<&str>,
    ) -> Result<JsonValue> {
        let full_url = self.absolute_url(url)?;
        let max_attempts = self.config.retry.max_attempts.max(1);

        let mut attempt = 0;
        loop {
            attempt += 1;

            let mut req = self.client.request(method.into(), &full_url);
            if let Some(token) = token {
                req = req.bearer_auth(token);
            }
            req = req.headers(self.build_headers(headers));
            if !params.is_empty() {
                req = req.query(params);
            }
            if let Some(body) = payload {
                req = req.json(body);
            }

            let response = req.send().await?;
            let status = response.status();

            if status.is_success() {
                debug!(url = %full_url, status = status.as_u16(), "request succeeded");
                return response.json::<JsonValue>().await.map_err(Error::Http);
            }

            let code = status.as_u16();
            if is_transient_status(code) && attempt < max_attempts {
                let delay = self.backoff_delay(attempt);
                warn!(
                    url = %full_url,
                    status = code,
                    attempt,
                    max_attempts,
                    ?delay,
                    "transient status, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(Error::HttpStatus { status: code, body });
        }
    }

    /// Merge default and caller headers; caller entries win on collision.
    fn build_headers(&self, headers: &HashMap<String, String>) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(agent) = HeaderValue::from_str(&self.config.user_agent) {
            map.insert(USER_AGENT, agent);
        }
        for (key, value) in self.config.default_headers.iter().chain(headers.iter()) {
            match (
                HeaderName::try_from(key.as_str()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    map.insert(name, value);
                }
                _ => warn!(header = %key, "skipping malformed header"),
            }
        }
        map
    }

    /// Backoff before the retry following the given 1-based attempt
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let delay = self.config.retry.initial_backoff.saturating_mul(factor);
        std::cmp::min(delay, self.config.retry.max_backoff)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
