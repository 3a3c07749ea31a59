//! # marlin
//!
//! Rust client library for the [MERMAID](https://datamermaid.org) marine-survey
//! data platform.
//!
//! The crate authenticates with a bearer token, fetches paginated JSON
//! collections from the REST API, reshapes them into columnar tables, and
//! optionally caches materialized tables on disk keyed by server-side
//! freshness.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use marlin::{Client, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder()
//!         .token(std::env::var("MERMAID_TOKEN").unwrap())
//!         .cache_dir(".cache")
//!         .build();
//!
//!     let observations = client.benthic_pit().observations("project-id").await?;
//!     println!("{} observations", observations.n_rows());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Resource Accessors                         │
//! │   projects  ·  sample method summaries  ·  sample events        │
//! └───────────────────────────────┬─────────────────────────────────┘
//!                                 │
//! ┌──────────┬───────────┬────────┴──────┬─────────────┬────────────┐
//! │  Cache   │ Paginate  │   Transport   │    Table    │   Render   │
//! ├──────────┼───────────┼───────────────┼─────────────┼────────────┤
//! │ Freshness│ Page count│ GET/POST      │ Materialize │ GeoJSON    │
//! │ probe    │ Concurrent│ Retry 502-504 │ Rename      │            │
//! │ gzip+idx │ fetch     │ Backoff       │ Project     │            │
//! └──────────┴───────────┴───────────────┴─────────────┴────────────┘
//! ```
//!
//! A table fetch checks the freshness cache first; on a miss the paginator
//! streams every page of the collection — concurrently once the total record
//! count is known and large enough — and the materialized table is written
//! back to the cache.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the client
pub mod error;

/// Common types and type aliases
pub mod types;

/// Access-token storage
pub mod auth;

/// HTTP transport with transient-status retries
pub mod http;

/// Pagination and concurrent page fetching
pub mod paginate;

/// Columnar table materialization
pub mod table;

/// Freshness-keyed on-disk cache
pub mod cache;

/// Client orchestration
pub mod client;

/// Resource accessors
pub mod resources;

/// GeoJSON rendering
pub mod render;

// ============================================================================
// Re-exports
// ============================================================================

pub use auth::{AuthStore, TokenProvider};
pub use cache::FreshnessCache;
pub use client::{Client, ClientBuilder, ListQuery};
pub use error::{Error, Result};
pub use http::RetryConfig;
pub use paginate::RecordStream;
pub use render::{to_geojson, to_geojson_with};
pub use resources::ProjectSearch;
pub use table::Table;
pub use types::{Method, Record};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
