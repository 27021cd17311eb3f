//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the StateStore trait.

use crate::classify::PageType;
use crate::state::FetchStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StateStore, StorageError, StorageResult};
use crate::storage::{FetchRecord, UrlState};
use crate::url::NormalizedUrl;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SELECT_COLUMNS: &str = "SELECT normalized_url, final_url, canonical_url, etag, last_modified,
     last_fetch, status, http_status, content_type, rejected_reason, blocked_reason,
     classification_type, classification_confidence
     FROM url_state";

/// SQLite state store backend
pub struct SqliteStateStore {
    conn: Mutex<Connection>,
}

impl SqliteStateStore {
    /// Opens or creates the state database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStateStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    /// Opens an existing database without creating or migrating anything
    ///
    /// Any write through the returned store fails.
    pub fn open_read_only(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// TTL decision against an explicit clock
    ///
    /// Age is measured in whole elapsed days (truncated), so a page fetched
    /// 23 hours ago is 0 days old and one fetched 25 hours ago is 1 day old.
    pub fn should_fetch_at(
        &self,
        url: &NormalizedUrl,
        ttl_days: u32,
        now: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let Some(state) = self.get(url)? else {
            return Ok(true);
        };

        if !state.status.is_some_and(|s| s.is_successful_fetch()) {
            return Ok(true);
        }

        let Some(last_fetch) = state.last_fetch else {
            return Ok(true);
        };

        let last_fetch = match DateTime::parse_from_rfc3339(&last_fetch) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                tracing::warn!(
                    "Unparsable last_fetch '{}' for {}: {}",
                    last_fetch,
                    url,
                    e
                );
                return Ok(true);
            }
        };

        Ok((now - last_fetch).num_days() >= i64::from(ttl_days))
    }

    /// Upsert with an explicit fetch timestamp
    pub fn upsert_fetch_at(
        &self,
        url: &NormalizedUrl,
        record: &FetchRecord,
        fetched_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO url_state (
                normalized_url, final_url, canonical_url, etag, last_modified, last_fetch,
                status, http_status, content_type, rejected_reason, blocked_reason,
                classification_type, classification_confidence
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, NULL, NULL)
             ON CONFLICT(normalized_url) DO UPDATE SET
                final_url = excluded.final_url,
                canonical_url = excluded.canonical_url,
                etag = excluded.etag,
                last_modified = excluded.last_modified,
                last_fetch = excluded.last_fetch,
                status = excluded.status,
                http_status = excluded.http_status,
                content_type = excluded.content_type,
                rejected_reason = excluded.rejected_reason,
                blocked_reason = excluded.blocked_reason",
            params![
                url.as_str(),
                record.final_url,
                record.canonical_url,
                record.etag,
                record.last_modified,
                fetched_at.to_rfc3339(),
                record.status.to_db_string(),
                record.http_status,
                record.content_type,
                record.rejected_reason,
                record.blocked_reason,
            ],
        )?;
        Ok(())
    }

    fn count_grouped(&self, sql: &str) -> StorageResult<BTreeMap<String, u64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let (key, count) = row?;
            counts.insert(key, count.max(0) as u64);
        }
        Ok(counts)
    }
}

fn row_to_state(row: &Row<'_>) -> rusqlite::Result<UrlState> {
    let status: Option<String> = row.get(6)?;
    let classification_type: Option<String> = row.get(11)?;

    Ok(UrlState {
        normalized_url: row.get(0)?,
        final_url: row.get(1)?,
        canonical_url: row.get(2)?,
        etag: row.get(3)?,
        last_modified: row.get(4)?,
        last_fetch: row.get(5)?,
        status: status.as_deref().and_then(FetchStatus::from_db_string),
        http_status: row.get(7)?,
        content_type: row.get(8)?,
        rejected_reason: row.get(9)?,
        blocked_reason: row.get(10)?,
        classification_type: classification_type.as_deref().and_then(PageType::from_name),
        classification_confidence: row.get(12)?,
    })
}

impl StateStore for SqliteStateStore {
    fn get(&self, url: &NormalizedUrl) -> StorageResult<Option<UrlState>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{} WHERE normalized_url = ?1", SELECT_COLUMNS))?;
        let state = stmt
            .query_row(params![url.as_str()], row_to_state)
            .optional()?;
        Ok(state)
    }

    fn should_fetch(&self, url: &NormalizedUrl, ttl_days: u32) -> StorageResult<bool> {
        self.should_fetch_at(url, ttl_days, Utc::now())
    }

    fn conditional_headers(&self, url: &NormalizedUrl) -> StorageResult<BTreeMap<String, String>> {
        let mut headers = BTreeMap::new();
        let Some(state) = self.get(url)? else {
            return Ok(headers);
        };

        if let Some(etag) = state.etag.filter(|v| !v.is_empty()) {
            headers.insert("If-None-Match".to_string(), etag);
        }
        if let Some(last_modified) = state.last_modified.filter(|v| !v.is_empty()) {
            headers.insert("If-Modified-Since".to_string(), last_modified);
        }
        Ok(headers)
    }

    fn upsert_fetch(&self, url: &NormalizedUrl, record: &FetchRecord) -> StorageResult<()> {
        self.upsert_fetch_at(url, record, Utc::now())
    }

    fn update_classification(
        &self,
        url: &NormalizedUrl,
        classification_type: Option<PageType>,
        confidence: Option<f64>,
    ) -> StorageResult<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE url_state SET classification_type = ?1, classification_confidence = ?2
             WHERE normalized_url = ?3",
            params![
                classification_type.map(|t| t.as_str()),
                confidence,
                url.as_str()
            ],
        )?;

        if updated == 0 {
            tracing::debug!("No state row for {}, classification dropped", url);
        }
        Ok(())
    }

    fn status_counts(&self) -> StorageResult<BTreeMap<String, u64>> {
        self.count_grouped(
            "SELECT COALESCE(status, 'unknown'), COUNT(*) FROM url_state GROUP BY 1",
        )
    }

    fn classification_counts(&self) -> StorageResult<BTreeMap<String, u64>> {
        self.count_grouped(
            "SELECT COALESCE(classification_type, 'unset'), COUNT(*) FROM url_state GROUP BY 1",
        )
    }
}
