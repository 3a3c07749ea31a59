//! Pagination and concurrent page fetching
//!
//! Drives the transport across the page sequence of one list request and
//! exposes the result as a single lazy stream of records. The first page is
//! always fetched and emitted on its own; once the total record count is
//! known, the remaining pages are fetched either sequentially or, when there
//! are enough of them, concurrently with bounded parallelism.
//!
//! # Ordering
//!
//! Records from page 1 are emitted first, in server order. Records from later
//! pages arrive in completion order when the concurrent path is taken; callers
//! that need a stable ordering must sort downstream by an explicit field.

mod stream;

pub use stream::RecordStream;

use crate::error::Result;
use crate::http::HttpClient;
use crate::types::{JsonValue, Method, Page, Record};
use futures::stream::{self as futures_stream, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Page size injected when the caller does not supply a `limit`
pub const DEFAULT_PAGE_LIMIT: u64 = 1000;

/// Minimum number of remaining pages before concurrent fetch pays off
pub const PARALLEL_PAGE_THRESHOLD: u64 = 5;

/// Upper bound on concurrently in-flight page requests
pub const MAX_CONCURRENT_PAGES: usize = 6;

const LIMIT_PARAM: &str = "limit";
const PAGE_PARAM: &str = "page";

/// Batches buffered in the channel between the driver task and the consumer
const PAGE_CHANNEL_CAPACITY: usize = 8;

/// Configuration for paginated fetching
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Allow concurrent fetch of later pages
    pub parallel: bool,
    /// Override for the concurrent fetch pool size
    pub concurrency: Option<usize>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            concurrency: None,
        }
    }
}

impl FetchConfig {
    /// Effective pool size for concurrent page fetches
    pub fn pool_size(&self) -> usize {
        self.concurrency.unwrap_or_else(default_pool_size)
    }
}

/// Pool size derived from the machine's logical core count
pub fn default_pool_size() -> usize {
    let cores = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1);
    pool_size_for_cores(cores)
}

fn pool_size_for_cores(cores: usize) -> usize {
    std::cmp::min(cores.saturating_sub(1).max(1) * 2, MAX_CONCURRENT_PAGES)
}

/// Request template for every page of one list fetch.
///
/// Each page fetch clones this template and attaches its own page index;
/// nothing is shared mutably between concurrent fetches.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub method: Method,
    /// Absolute URL of the list endpoint
    pub url: String,
    /// Query parameters in caller-supplied order
    pub params: Vec<(String, String)>,
    pub headers: HashMap<String, String>,
    pub payload: Option<JsonValue>,
    pub token: Option<String>,
}

impl PageRequest {
    /// Create a GET page request for the given absolute URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            params: Vec::new(),
            headers: HashMap::new(),
            payload: None,
            token: None,
        }
    }
}

/// Drives the transport across a page sequence, producing a record stream
pub struct Paginator {
    transport: Arc<HttpClient>,
    config: FetchConfig,
}

impl Paginator {
    /// Create a paginator over the given transport
    pub fn new(transport: Arc<HttpClient>, config: FetchConfig) -> Self {
        Self { transport, config }
    }

    /// Start fetching and return the single-pass record stream.
    ///
    /// The returned stream is lazy in the sense that page fetching is bounded
    /// by channel backpressure, and non-restartable: it can be consumed once.
    /// Dropping it cancels any outstanding page fetches.
    pub fn stream(&self, request: PageRequest) -> RecordStream {
        let (tx, rx) = mpsc::channel(PAGE_CHANNEL_CAPACITY);
        let transport = Arc::clone(&self.transport);
        let config = self.config.clone();
        tokio::spawn(drive(transport, config, request, tx));
        RecordStream::new(rx)
    }
}

/// Driver task: fetches page 1, then the rest sequentially or concurrently.
///
/// Failures are forwarded into the channel and end the fetch; a send failure
/// means the consumer hung up and the remaining pages are abandoned.
async fn drive(
    transport: Arc<HttpClient>,
    config: FetchConfig,
    request: PageRequest,
    tx: mpsc::Sender<Result<Vec<Record>>>,
) {
    let mut params = request.params.clone();
    if !params.iter().any(|(key, _)| key == LIMIT_PARAM) {
        params.push((LIMIT_PARAM.to_string(), DEFAULT_PAGE_LIMIT.to_string()));
    }
    let limit = params
        .iter()
        .find(|(key, _)| key == LIMIT_PARAM)
        .and_then(|(_, value)| value.parse::<u64>().ok())
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .max(1);

    let first = match fetch_page(&transport, &request, &params, None).await {
        Ok(page) => page,
        Err(e) => {
            let _ = tx.send(Err(e)).await;
            return;
        }
    };

    // Only the first page's count governs how many pages are fetched.
    let total_pages = first.count.div_ceil(limit);
    let mut next = first.next.clone();
    debug!(
        url = %request.url,
        count = first.count,
        total_pages,
        "first page fetched"
    );
    if tx.send(Ok(first.results)).await.is_err() {
        return;
    }
    if total_pages <= 1 {
        return;
    }

    let pages_remaining = total_pages - 1;
    let pool = config.pool_size();

    if config.parallel && pool > 1 && pages_remaining >= PARALLEL_PAGE_THRESHOLD {
        debug!(pages_remaining, pool, "fetching remaining pages concurrently");
        let fetches = futures_stream::iter(2..=total_pages).map(|page| {
            let transport = Arc::clone(&transport);
            let request = request.clone();
            let params = params.clone();
            async move { fetch_page(&transport, &request, &params, Some(page)).await }
        });
        let mut inflight = fetches.buffer_unordered(pool);

        while let Some(result) = inflight.next().await {
            match result {
                Ok(page) => {
                    if tx.send(Ok(page.results)).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    // Dropping `inflight` cancels the in-flight sibling fetches.
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            }
        }
    } else {
        for page in 2..=total_pages {
            if next.is_none() {
                break;
            }
            match fetch_page(&transport, &request, &params, Some(page)).await {
                Ok(response) => {
                    let Page { next: page_next, results, .. } = response;
                    next = page_next;
                    if tx.send(Ok(results)).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            }
        }
    }
}

/// Fetch a single page; `page` is absent for the first request
async fn fetch_page(
    transport: &HttpClient,
    request: &PageRequest,
    params: &[(String, String)],
    page: Option<u64>,
) -> Result<Page> {
    let mut params = params.to_vec();
    if let Some(page) = page {
        params.push((PAGE_PARAM.to_string(), page.to_string()));
    }
    let body = transport
        .send(
            request.method,
            &request.url,
            &params,
            request.payload.as_ref(),
            &request.headers,
            request.token.as_deref(),
        )
        .await?;
    Ok(serde_json::from_value(body)?)
}
