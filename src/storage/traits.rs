//! Storage traits and error types
//!
//! This module defines the trait interface for the URL state store and
//! associated error types.

use crate::classify::PageType;
use crate::storage::{FetchRecord, UrlState};
use crate::url::NormalizedUrl;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("State store lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistent per-URL crawl state
///
/// Each method is a single atomic unit against the store. Implementations
/// must be usable from several fetch workers at once.
pub trait StateStore: Send + Sync {
    /// Gets the state row for a URL
    fn get(&self, url: &NormalizedUrl) -> StorageResult<Option<UrlState>>;

    /// Decides whether a URL is due for (re)fetching
    ///
    /// True when there is no row, no successful prior fetch, an unparsable
    /// timestamp, or the last fetch is at least `ttl_days` whole days old.
    fn should_fetch(&self, url: &NormalizedUrl, ttl_days: u32) -> StorageResult<bool>;

    /// Builds `If-None-Match` / `If-Modified-Since` from stored validators
    fn conditional_headers(&self, url: &NormalizedUrl) -> StorageResult<BTreeMap<String, String>>;

    /// Inserts or updates the fetch fields of a row
    ///
    /// Sets `last_fetch` to the current time. Classification fields are
    /// never touched on this path.
    fn upsert_fetch(&self, url: &NormalizedUrl, record: &FetchRecord) -> StorageResult<()>;

    /// Updates only the classification fields
    ///
    /// A URL without a row is silently ignored.
    fn update_classification(
        &self,
        url: &NormalizedUrl,
        classification_type: Option<PageType>,
        confidence: Option<f64>,
    ) -> StorageResult<()>;

    /// Counts rows per fetch status
    fn status_counts(&self) -> StorageResult<BTreeMap<String, u64>>;

    /// Counts rows per classification type (`unset` for none)
    fn classification_counts(&self) -> StorageResult<BTreeMap<String, u64>>;
}
