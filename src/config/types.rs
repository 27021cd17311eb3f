use crate::robots::{RobotsMode, RobotsRefresh};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Job-Sieve
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub capsule: CapsuleConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub classifier: Option<ClassifierConfig>,
}

/// Fetch behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Maximum number of fetches in flight at once
    pub concurrency: u32,

    /// Additional attempts after the first failed one
    pub retries: u32,

    /// Per-request timeout for page fetches (seconds)
    pub timeout_secs: u64,

    /// Timeout for a single robots.txt fetch (seconds)
    pub robots_timeout_secs: u64,

    /// Whether robots.txt denials fail the fetch or are only logged
    pub robots_mode: RobotsMode,

    /// Minimum age in days before a fetched URL is refetched
    pub ttl_days: u32,

    /// Backoff time unit between retries (milliseconds)
    pub backoff_ms: u64,

    /// Refetch robots.txt after this many hours (kept for the run when unset)
    pub robots_refresh_hours: Option<u32>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            retries: 2,
            timeout_secs: 30,
            robots_timeout_secs: 10,
            robots_mode: RobotsMode::Enforce,
            ttl_days: 7,
            backoff_ms: 1000,
            robots_refresh_hours: None,
        }
    }
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn robots_timeout(&self) -> Duration {
        Duration::from_secs(self.robots_timeout_secs)
    }

    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn robots_refresh(&self) -> RobotsRefresh {
        match self.robots_refresh_hours {
            Some(hours) => RobotsRefresh::After(chrono::Duration::hours(i64::from(hours))),
            None => RobotsRefresh::Never,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Capsule extraction limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CapsuleConfig {
    /// Maximum characters kept in the text snippet
    pub max_text_length: usize,

    /// Pages with less visible text than this are thin
    pub min_text_length: usize,

    /// Maximum job links collected per page
    pub job_link_limit: usize,
}

impl Default for CapsuleConfig {
    fn default() -> Self {
        Self {
            max_text_length: 1200,
            min_text_length: 200,
            job_link_limit: 50,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite state database
    pub database_path: String,

    /// Directory for raw HTML artifacts (none written when absent)
    #[serde(default)]
    pub artifact_dir: Option<PathBuf>,
}

/// External classifier program configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClassifierConfig {
    /// Program to execute
    #[serde(default = "default_classifier_program")]
    pub program: String,

    /// Extra arguments passed before the model flag
    #[serde(default = "default_classifier_args")]
    pub args: Vec<String>,

    /// Model name handed to the program
    pub model: String,

    /// Request search-augmented classification
    #[serde(default)]
    pub use_search: bool,

    /// Upper bound for one classification call (seconds)
    #[serde(default = "default_classifier_timeout")]
    pub timeout_secs: u64,
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_classifier_program() -> String {
    "codex".to_string()
}

fn default_classifier_args() -> Vec<String> {
    vec!["--non-interactive".to_string()]
}

fn default_classifier_timeout() -> u64 {
    120
}
