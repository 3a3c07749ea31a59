//! API client orchestration
//!
//! Ties the transport, paginator, materializer and freshness cache together
//! behind the resource-level fetch operations. The flow for a table fetch is:
//! auth precondition → cache probe/read (when a cache is configured) →
//! paginated fetch → materialize → cache write.

use crate::cache::{CacheKey, FreshnessCache};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RetryConfig};
use crate::paginate::{FetchConfig, PageRequest, Paginator, RecordStream};
use crate::table::{materialize, Table};
use crate::types::{JsonValue, Method};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const LIMIT_PARAM: &str = "limit";

// ============================================================================
// List Query
// ============================================================================

/// One list-endpoint request plus its finalize-time shaping.
///
/// Queries require authentication unless marked public via
/// [`ListQuery::public`]; the token precondition is checked before any
/// network call.
#[derive(Debug, Clone)]
pub struct ListQuery {
    /// Endpoint path, absolute or relative to the client's base URL
    pub path: String,
    pub method: Method,
    /// Query parameters in supplied order
    pub params: Vec<(String, String)>,
    pub headers: HashMap<String, String>,
    pub payload: Option<JsonValue>,
    /// Whether the endpoint needs a bearer token
    pub requires_auth: bool,
    /// Columns to project onto, post-rename; absent means all
    pub columns: Option<Vec<String>>,
    /// Column rename mapping applied before projection
    pub rename: Option<HashMap<String, String>>,
}

impl ListQuery {
    /// Create an authenticated GET query for the given path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::Get,
            params: Vec::new(),
            headers: HashMap::new(),
            payload: None,
            requires_auth: true,
            columns: None,
            rename: None,
        }
    }

    /// Add a query parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the HTTP method
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set a JSON payload
    #[must_use]
    pub fn payload(mut self, payload: JsonValue) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Mark the endpoint as not requiring authentication
    #[must_use]
    pub fn public(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    /// Project the materialized table onto these columns
    #[must_use]
    pub fn columns<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Rename a column before projection
    #[must_use]
    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rename
            .get_or_insert_with(HashMap::new)
            .insert(from.into(), to.into());
        self
    }
}

// ============================================================================
// Client
// ============================================================================

/// Client for the MERMAID API
pub struct Client {
    http: Arc<HttpClient>,
    paginator: Paginator,
    token: Option<String>,
    cache: Option<FreshnessCache>,
}

impl Client {
    /// Create a client builder
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Create a client with default configuration and no token
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a client with default configuration and the given token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self::builder().token(token).build()
    }

    /// The configured bearer token, if any
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Token precondition for authenticated operations
    fn require_token(&self) -> Result<&str> {
        self.token.as_deref().ok_or(Error::AuthRequired)
    }

    fn resolve_token(&self, query: &ListQuery) -> Result<Option<String>> {
        if query.requires_auth {
            Ok(Some(self.require_token()?.to_string()))
        } else {
            Ok(self.token.clone())
        }
    }

    fn page_request(&self, query: &ListQuery, url: String, token: Option<String>) -> PageRequest {
        PageRequest {
            method: query.method,
            url,
            params: query.params.clone(),
            headers: query.headers.clone(),
            payload: query.payload.clone(),
            token,
        }
    }

    /// Issue a single request and return the parsed response body
    pub async fn fetch(&self, query: &ListQuery) -> Result<JsonValue> {
        let token = self.resolve_token(query)?;
        self.http
            .send(
                query.method,
                &query.path,
                &query.params,
                query.payload.as_ref(),
                &query.headers,
                token.as_deref(),
            )
            .await
    }

    /// Stream every record of a list endpoint.
    ///
    /// The stream is single-pass and non-restartable; records from the first
    /// page arrive first, later pages in completion order when fetched
    /// concurrently.
    pub fn stream(&self, query: &ListQuery) -> Result<RecordStream> {
        let token = self.resolve_token(query)?;
        let url = self.http.absolute_url(&query.path)?;
        Ok(self.paginator.stream(self.page_request(query, url, token)))
    }

    /// Fetch a complete table, through the freshness cache when one is
    /// configured.
    pub async fn table(&self, query: &ListQuery) -> Result<Table> {
        let token = self.resolve_token(query)?;
        let url = self.http.absolute_url(&query.path)?;

        let key = match &self.cache {
            Some(_) => Some(CacheKey::derive(&url, &query.params)?),
            None => None,
        };
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            let current = self
                .probe_freshness(&url, query, token.as_deref(), cache.freshness_field())
                .await?;
            if let Some(table) = cache.read(key, current.as_deref()) {
                debug!(url = %url, rows = table.n_rows(), "serving table from cache");
                return Ok(table);
            }
        }

        let records = self
            .paginator
            .stream(self.page_request(query, url, token))
            .collect_records()
            .await?;
        let table = materialize(records, query.columns.as_deref(), query.rename.as_ref())?;

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            cache.write(key, &table)?;
        }
        Ok(table)
    }

    /// Read the cached table for a query, if still fresh.
    ///
    /// Probes the server for the current freshness token; a probe failure
    /// surfaces rather than silently serving stale data. Returns `None` when
    /// no cache is configured, the entry is missing, or the token changed.
    pub async fn read_cache(&self, query: &ListQuery) -> Result<Option<Table>> {
        let Some(cache) = &self.cache else {
            return Ok(None);
        };
        let token = self.resolve_token(query)?;
        let url = self.http.absolute_url(&query.path)?;
        let key = CacheKey::derive(&url, &query.params)?;
        let current = self
            .probe_freshness(&url, query, token.as_deref(), cache.freshness_field())
            .await?;
        Ok(cache.read(&key, current.as_deref()))
    }

    /// Store a table in the cache for a query and hand it back unchanged.
    ///
    /// A no-op when no cache is configured or the table is empty or lacks
    /// the freshness column.
    pub fn write_cache(&self, query: &ListQuery, table: Table) -> Result<Table> {
        if let Some(cache) = &self.cache {
            let url = self.http.absolute_url(&query.path)?;
            let key = CacheKey::derive(&url, &query.params)?;
            cache.write(&key, &table)?;
        }
        Ok(table)
    }

    /// Ask the server for the current freshness token: the freshness field of
    /// the single most recent record, not the full collection.
    async fn probe_freshness(
        &self,
        url: &str,
        query: &ListQuery,
        token: Option<&str>,
        field: &str,
    ) -> Result<Option<String>> {
        let mut params: Vec<(String, String)> = query
            .params
            .iter()
            .filter(|(key, _)| key != LIMIT_PARAM)
            .cloned()
            .collect();
        params.push((LIMIT_PARAM.to_string(), "1".to_string()));

        let body = self
            .http
            .send(Method::Get, url, &params, None, &query.headers, token)
            .await?;
        Ok(body
            .get("results")
            .and_then(|results| results.get(0))
            .and_then(|record| record.get(field))
            .and_then(|value| value.as_str())
            .map(str::to_string))
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("has_token", &self.token.is_some())
            .field("has_cache", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Client`]
#[derive(Default)]
pub struct ClientBuilder {
    http_config: HttpClientConfig,
    fetch: FetchConfig,
    token: Option<String>,
    cache: Option<FreshnessCache>,
}

impl ClientBuilder {
    /// Set the API base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.http_config.base_url = url.into();
        self
    }

    /// Set the bearer token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Take the token from a provider; an absent token leaves the client
    /// restricted to public endpoints
    pub fn token_provider(mut self, provider: &dyn crate::auth::TokenProvider) -> Self {
        self.token = provider.get_token();
        self
    }

    /// Set the retry configuration for the transport
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.http_config.retry = retry;
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.http_config.timeout = timeout;
        self
    }

    /// Set the client identifier sent with every request
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.http_config.user_agent = agent.into();
        self
    }

    /// Disable concurrent page fetching
    pub fn sequential(mut self) -> Self {
        self.fetch.parallel = false;
        self
    }

    /// Override the concurrent fetch pool size
    pub fn concurrency(mut self, pool_size: usize) -> Self {
        self.fetch.concurrency = Some(pool_size);
        self
    }

    /// Enable the freshness cache under the given directory
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache = Some(FreshnessCache::new(dir));
        self
    }

    /// Enable a preconfigured freshness cache
    pub fn cache(mut self, cache: FreshnessCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the client
    pub fn build(self) -> Client {
        let http = Arc::new(HttpClient::with_config(self.http_config));
        let paginator = Paginator::new(Arc::clone(&http), self.fetch);
        Client {
            http,
            paginator,
            token: self.token,
            cache: self.cache,
        }
    }
}
