//! Freshness-keyed on-disk table cache
//!
//! Persists materialized tables under a cache directory, two files per entry:
//! a gzip-compressed JSON table (`<key>.json.gz`) and a plain-text index file
//! (`<key>.idx`) holding exactly the freshness token the table was stored
//! under. An entry is served only while the server still reports the same
//! token; any disagreement between the files, or a missing half of the pair,
//! reads as a miss.
//!
//! The directory is shared process-wide without locking; concurrent writers
//! to the same key resolve as last-writer-wins.

use crate::error::Result;
use crate::table::Table;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

/// Default cache directory, relative to the working directory
pub const DEFAULT_CACHE_DIR: &str = ".cache";

/// Record field holding the server-reported freshness token
pub const FRESHNESS_FIELD: &str = "created_on";

const LIMIT_PARAM: &str = "limit";

// ============================================================================
// Cache Key
// ============================================================================

/// Deterministic cache key derived from a request's URL and query parameters.
///
/// The key encodes the fully-qualified URL with the caller's parameters
/// appended in supplied order, excluding `limit` (page size does not change
/// the logical result set). The encoding is URL-safe base64, collision-free
/// by construction, and doubles as the on-disk filename stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for the given absolute URL and query parameters
    pub fn derive(url: &str, params: &[(String, String)]) -> Result<Self> {
        let mut url = Url::parse(url)?;
        let filtered: Vec<_> = params.iter().filter(|(key, _)| key != LIMIT_PARAM).collect();
        if !filtered.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in filtered {
                pairs.append_pair(key, value);
            }
        }
        Ok(Self(URL_SAFE_NO_PAD.encode(url.as_str())))
    }

    /// The encoded key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Freshness Cache
// ============================================================================

/// On-disk cache of materialized tables, invalidated by freshness token
#[derive(Debug, Clone)]
pub struct FreshnessCache {
    dir: PathBuf,
    freshness_field: String,
}

impl FreshnessCache {
    /// Create a cache rooted at the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            freshness_field: FRESHNESS_FIELD.to_string(),
        }
    }

    /// Override the record field used as the freshness token
    pub fn with_freshness_field(mut self, field: impl Into<String>) -> Self {
        self.freshness_field = field.into();
        self
    }

    /// Cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record field used as the freshness token
    pub fn freshness_field(&self) -> &str {
        &self.freshness_field
    }

    /// On-disk paths for an entry: (data file, index file)
    pub fn entry_paths(&self, key: &CacheKey) -> (PathBuf, PathBuf) {
        let data = self.dir.join(format!("{}.json.gz", key.as_str()));
        let index = self.dir.join(format!("{}.idx", key.as_str()));
        (data, index)
    }

    /// Read the entry for `key` if it is still fresh.
    ///
    /// `current_token` is the freshness token the server reports right now;
    /// the stored token must match it byte-for-byte. A missing entry, a
    /// token mismatch, or a corrupt file pair all read as a miss.
    pub fn read(&self, key: &CacheKey, current_token: Option<&str>) -> Option<Table> {
        let current = current_token?;
        let (data_path, idx_path) = self.entry_paths(key);
        if !data_path.exists() || !idx_path.exists() {
            return None;
        }

        let stored = match fs::read_to_string(&idx_path) {
            Ok(token) => token,
            Err(e) => {
                warn!(path = %idx_path.display(), error = %e, "unreadable cache index, treating as miss");
                return None;
            }
        };
        if stored != current {
            debug!(key = key.as_str(), "cache entry stale");
            return None;
        }

        match load_table(&data_path) {
            Ok(table) => {
                debug!(key = key.as_str(), rows = table.n_rows(), "cache hit");
                Some(table)
            }
            Err(e) => {
                warn!(path = %data_path.display(), error = %e, "corrupt cache entry, treating as miss");
                None
            }
        }
    }

    /// Store a table under `key`.
    ///
    /// A table that is empty or lacks the freshness column is never cached;
    /// the call is a no-op. The index file is written before the data file,
    /// so a torn write reads back as a stale or corrupt entry, never as a
    /// spuriously-fresh one.
    pub fn write(&self, key: &CacheKey, table: &Table) -> Result<()> {
        if table.is_empty() || !table.has_column(&self.freshness_field) {
            return Ok(());
        }
        let Some(token) = table
            .value(0, &self.freshness_field)
            .and_then(|value| value.as_str())
        else {
            return Ok(());
        };
        let token = token.to_string();

        fs::create_dir_all(&self.dir)?;
        let (data_path, idx_path) = self.entry_paths(key);
        fs::write(&idx_path, &token)?;

        let file = File::create(&data_path)?;
        let mut encoder = GzEncoder::new(file, Compression::fast());
        encoder.write_all(&serde_json::to_vec(table)?)?;
        encoder.finish()?;

        debug!(key = key.as_str(), rows = table.n_rows(), "cache entry written");
        Ok(())
    }
}

impl Default for FreshnessCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR)
    }
}

fn load_table(path: &Path) -> Result<Table> {
    let file = File::open(path)?;
    let mut decoder = GzDecoder::new(file);
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(serde_json::from_slice(&buf)?)
}
