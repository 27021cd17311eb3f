//! Concurrent page fetcher
//!
//! This module handles all page requests for the crawler, including:
//! - Bounded parallelism through a shared semaphore
//! - Robots.txt checks before every attempt
//! - Retry with linear backoff on transport failures and non-2xx answers
//! - Conditional requests (a 304 to a conditional request is a success)
//!
//! The fetcher performs no persistence; callers turn each [`FetchOutcome`]
//! into a state-store update.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::transport::{
    build_http_client, format_user_agent, HttpResponse, ReqwestTransport, Transport,
    TransportError,
};
use crate::robots::{RobotsCache, RobotsMode};
use crate::url::parse_http_url;
use crate::SieveError;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;

/// Final failure of a fetch once retries are exhausted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("HTTP {0}")]
    Status(u16),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl FetchFailure {
    /// HTTP status of the last attempt, if one was received
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status(status) => Some(*status),
            Self::Transport(_) => None,
        }
    }
}

/// A URL to fetch plus extra request headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Attaches conditional request headers
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Returns true if the request carries validator headers
    pub fn is_conditional(&self) -> bool {
        self.headers.iter().any(|(name, _)| {
            name.eq_ignore_ascii_case("If-None-Match")
                || name.eq_ignore_ascii_case("If-Modified-Since")
        })
    }
}

impl From<&str> for FetchRequest {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for FetchRequest {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

/// A successfully fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    /// The URL as requested
    pub url: String,

    /// URL after following redirects
    pub final_url: String,

    /// HTTP status code (2xx, or 304 for an unchanged conditional fetch)
    pub status: u16,

    /// Content-Type header value
    pub content_type: Option<String>,

    /// ETag header value
    pub etag: Option<String>,

    /// Last-Modified header value
    pub last_modified: Option<String>,

    /// Response body text (empty for 304)
    pub body: String,
}

impl FetchResult {
    fn from_response(url: &str, response: HttpResponse) -> Self {
        Self {
            url: url.to_string(),
            final_url: response.final_url,
            status: response.status,
            content_type: response.content_type,
            etag: response.etag,
            last_modified: response.last_modified,
            body: response.body,
        }
    }

    /// Returns true if the origin reported the page unchanged
    pub fn not_modified(&self) -> bool {
        self.status == 304
    }

    /// Returns true if the content type is HTML (a missing header counts as HTML)
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            None => true,
            Some(value) => {
                let value = value.to_ascii_lowercase();
                value.contains("text/html") || value.contains("application/xhtml+xml")
            }
        }
    }
}

/// One entry of a batch fetch
#[derive(Debug)]
pub struct FetchOutcome {
    /// The URL as requested
    pub url: String,

    /// The fetched page or the per-URL failure
    pub result: Result<FetchResult, SieveError>,
}

/// Fetch policy shared by all requests of a fetcher
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Maximum number of requests in flight
    pub concurrency: usize,

    /// Additional attempts after the first failed one
    pub retries: u32,

    /// What to do when robots.txt denies a URL
    pub robots_mode: RobotsMode,

    /// Backoff time unit; attempt `n` waits `(n + 1)` units before retrying
    pub backoff_unit: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

impl FetchSettings {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            concurrency: config.concurrency as usize,
            retries: config.retries,
            robots_mode: config.robots_mode,
            backoff_unit: config.backoff_unit(),
        }
    }
}

/// Robots-aware fetcher with bounded concurrency and retries
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    robots: Arc<RobotsCache>,
    settings: FetchSettings,
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        robots: Arc<RobotsCache>,
        settings: FetchSettings,
    ) -> Self {
        Self {
            transport,
            robots,
            settings,
        }
    }

    /// Builds a fetcher over one shared reqwest client
    ///
    /// The robots cache uses the same transport and evaluates rules for the
    /// configured user agent.
    pub fn from_config(config: &Config) -> Result<Self, SieveError> {
        let client = build_http_client(&config.user_agent, config.crawler.timeout())?;
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(client));
        let robots = RobotsCache::new(
            transport.clone(),
            format_user_agent(&config.user_agent),
            config.crawler.robots_timeout(),
        )
        .with_refresh(config.crawler.robots_refresh());

        Ok(Self::new(
            transport,
            Arc::new(robots),
            FetchSettings::from_config(&config.crawler),
        ))
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Fetches every request, at most `concurrency` at a time
    ///
    /// Returns exactly one outcome per request. Outcomes are in input order,
    /// but completion order across URLs is unspecified. A failing URL never
    /// affects its siblings.
    pub async fn fetch_all<I, R>(&self, requests: I) -> Vec<FetchOutcome>
    where
        I: IntoIterator<Item = R>,
        R: Into<FetchRequest>,
    {
        let gate = Semaphore::new(self.settings.concurrency.max(1));
        let gate = &gate;

        let tasks = requests.into_iter().map(Into::into).map(|request| async move {
            // The semaphore is never closed, so acquire cannot fail
            let _permit = gate.acquire().await.ok();
            tracing::info!("Fetching {}", request.url);
            let result = self.fetch_one(&request).await;
            FetchOutcome {
                url: request.url,
                result,
            }
        });

        join_all(tasks).await
    }

    /// Fetches a single URL with robots checks and retries
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResult)` - A 2xx answer, or 304 to a conditional request
    /// * `Err(SieveError::InvalidUrl)` - Not an absolute http(s) URL; not retried
    /// * `Err(SieveError::RobotsDisallowed)` - Denied while enforcing robots.txt
    /// * `Err(SieveError::Fetch)` - Last failure after all attempts
    pub async fn fetch_one(&self, request: &FetchRequest) -> Result<FetchResult, SieveError> {
        let target = parse_http_url(&request.url)?;
        let conditional = request.is_conditional();
        let attempts = self.settings.retries + 1;
        let mut last_failure = None;

        for attempt in 0..attempts {
            self.check_robots(target.as_str()).await?;

            match self.transport.get(target.as_str(), &request.headers).await {
                Ok(response) if response.is_success() => {
                    return Ok(FetchResult::from_response(&request.url, response));
                }
                Ok(response) if conditional && response.status == 304 => {
                    tracing::debug!("{} not modified", request.url);
                    return Ok(FetchResult::from_response(&request.url, response));
                }
                Ok(response) => last_failure = Some(FetchFailure::Status(response.status)),
                Err(e) => last_failure = Some(FetchFailure::Transport(e)),
            }

            if attempt + 1 < attempts {
                let delay = self.settings.backoff_unit * (attempt + 1);
                tracing::debug!(
                    "Attempt {}/{} for {} failed, retrying in {:?}",
                    attempt + 1,
                    attempts,
                    request.url,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }

        let failure = last_failure
            .unwrap_or_else(|| FetchFailure::Transport(TransportError::Other("no attempt".into())));
        tracing::warn!(
            "Giving up on {} after {} attempt(s): {}",
            request.url,
            attempts,
            failure
        );

        Err(SieveError::Fetch {
            url: request.url.clone(),
            attempts,
            failure,
        })
    }

    async fn check_robots(&self, url: &str) -> Result<(), SieveError> {
        if self.robots.is_allowed(url).await? {
            return Ok(());
        }

        match self.settings.robots_mode {
            RobotsMode::Enforce => Err(SieveError::RobotsDisallowed {
                url: url.to_string(),
            }),
            RobotsMode::Advise => {
                tracing::debug!("robots.txt disallows {} but enforcement is off", url);
                Ok(())
            }
        }
    }
}
