//! Common types used throughout the marlin client
//!
//! Shared type definitions and aliases used across multiple modules.

use serde::Deserialize;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// One record returned by the API: an opaque field-to-value mapping.
///
/// Records carry no schema; fields vary per resource type and values keep
/// their JSON scalar/nested types untouched.
pub type Record = serde_json::Map<String, JsonValue>;

// ============================================================================
// HTTP Method
// ============================================================================

/// HTTP method supported by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        }
    }
}

// ============================================================================
// Page Envelope
// ============================================================================

/// One list-endpoint response: a bounded batch of records plus pagination
/// metadata.
///
/// `count` is the total number of records across all pages of the request;
/// the value reported by the first page governs how many pages are fetched.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    /// Total record count across all pages of this request
    #[serde(default)]
    pub count: u64,
    /// URL of the next page, absent on the last page
    #[serde(default)]
    pub next: Option<String>,
    /// Records in this page, in server order
    #[serde(default)]
    pub results: Vec<Record>,
}
