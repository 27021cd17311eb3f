//! Job-Sieve: a crawl-and-prefilter engine for job postings
//!
//! This crate takes candidate URLs from an external discovery step, fetches
//! them politely (robots.txt, bounded concurrency, retry with backoff), keeps a
//! persistent per-URL state store for TTL-driven recrawls, and reduces each
//! fetched page into a compact capsule for an external classifier.

pub mod capsule;
pub mod classify;
pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Job-Sieve operations
#[derive(Debug, Error)]
pub enum SieveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("URL disallowed by robots.txt: {url}")]
    RobotsDisallowed { url: String },

    #[error("Fetch failed for {url} after {attempts} attempt(s): {failure}")]
    Fetch {
        url: String,
        attempts: u32,
        failure: crawler::FetchFailure,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

impl SieveError {
    /// Returns true for failures that concern a single URL only
    ///
    /// Per-URL failures never abort sibling fetches; callers record them in
    /// the state store and move on.
    pub fn is_per_url(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl(_) | Self::RobotsDisallowed { .. } | Self::Fetch { .. }
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for Job-Sieve operations
pub type Result<T> = std::result::Result<T, SieveError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use capsule::{build_capsule, extract_job_links, is_thin_content, Capsule};
pub use config::Config;
pub use crawler::{CrawlReport, FetchResult, Fetcher, Pipeline};
pub use state::FetchStatus;
pub use storage::{SqliteStateStore, StateStore, UrlState};
pub use url::{normalize, NormalizedUrl};
