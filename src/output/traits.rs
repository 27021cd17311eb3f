//! Output traits and types
//!
//! This module defines the artifact writer interface and the metadata
//! written next to each saved page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Sidecar metadata for a saved page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// URL the page was fetched from
    pub url: String,

    /// RFC3339 fetch time
    pub crawl_time: String,

    /// Host label, dots replaced by dashes
    pub source: String,
}

/// Paths of one written artifact pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub item_id: u32,
    pub html_path: PathBuf,
    pub meta_path: PathBuf,
}

/// Sink for raw fetched pages
pub trait ArtifactWriter: Send + Sync {
    /// Saves the page body and its metadata
    fn write(
        &self,
        url: &str,
        html: &str,
        crawl_time: DateTime<Utc>,
    ) -> OutputResult<ArtifactRecord>;
}
