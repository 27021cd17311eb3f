//! Storage module for persisting crawl state
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Per-URL fetch state keyed by normalized URL
//! - TTL-driven recrawl decisions and conditional request headers
//! - Classification results

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStateStore;
pub use traits::{StateStore, StorageError, StorageResult};

use crate::classify::PageType;
use crate::state::FetchStatus;

use std::path::Path;

/// Opens or creates the state database at `path`
pub fn open_state_store(path: &Path) -> StorageResult<SqliteStateStore> {
    SqliteStateStore::new(path)
}

/// Opens the state database for inspection only
///
/// A missing database reads as empty and nothing is created on disk.
pub fn inspect_state_store(path: &Path) -> StorageResult<SqliteStateStore> {
    if path.exists() {
        SqliteStateStore::open_read_only(path)
    } else {
        SqliteStateStore::new_in_memory()
    }
}

/// Stored state of one normalized URL
#[derive(Debug, Clone, PartialEq)]
pub struct UrlState {
    pub normalized_url: String,
    pub final_url: Option<String>,
    pub canonical_url: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    /// RFC 3339 timestamp of the last upsert
    pub last_fetch: Option<String>,
    pub status: Option<FetchStatus>,
    pub http_status: Option<u16>,
    pub content_type: Option<String>,
    pub rejected_reason: Option<String>,
    pub blocked_reason: Option<String>,
    pub classification_type: Option<PageType>,
    pub classification_confidence: Option<f64>,
}

/// Fetch fields written by [`StateStore::upsert_fetch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRecord {
    pub final_url: Option<String>,
    pub canonical_url: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub status: FetchStatus,
    pub http_status: Option<u16>,
    pub content_type: Option<String>,
    pub rejected_reason: Option<String>,
    pub blocked_reason: Option<String>,
}

impl FetchRecord {
    /// Creates a record with the given status and every other field unset
    pub fn new(status: FetchStatus) -> Self {
        Self {
            final_url: None,
            canonical_url: None,
            etag: None,
            last_modified: None,
            status,
            http_status: None,
            content_type: None,
            rejected_reason: None,
            blocked_reason: None,
        }
    }

    /// Record for a robots.txt refusal
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            blocked_reason: Some(reason.into()),
            ..Self::new(FetchStatus::Blocked)
        }
    }

    /// Record for a fetch that failed after retries
    pub fn error(http_status: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            http_status,
            rejected_reason: Some(reason.into()),
            ..Self::new(FetchStatus::Error)
        }
    }
}
