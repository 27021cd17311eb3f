//! Origin-keyed robots.txt cache
//!
//! Each origin gets one slot holding a `tokio::sync::OnceCell`. The first
//! caller for an origin performs the robots.txt fetch inside the cell's
//! initializer; concurrent callers for the same origin wait on that single
//! fetch instead of issuing their own. Once populated, reads go through the
//! cell without holding the map lock.

use crate::crawler::Transport;
use crate::robots::ParsedRobots;
use crate::url::{origin_of, parse_http_url};
use crate::UrlError;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// When a cached robots policy is considered stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RobotsRefresh {
    /// Keep the policy for the lifetime of the cache
    #[default]
    Never,

    /// Refetch the policy once it is older than the given age
    After(Duration),
}

/// Cached robots.txt policy for an origin
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub content: ParsedRobots,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Creates a new entry stamped with the current time
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }

    /// Returns the age of the cached entry
    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }

    /// Checks the entry against a refresh policy
    pub fn is_stale(&self, refresh: RobotsRefresh) -> bool {
        match refresh {
            RobotsRefresh::Never => false,
            RobotsRefresh::After(max_age) => self.age() > max_age,
        }
    }
}

type Slot = Arc<OnceCell<CachedRobots>>;

/// Resolves per-origin fetch permission, fetching robots.txt lazily
pub struct RobotsCache {
    transport: Arc<dyn Transport>,
    user_agent: String,
    timeout: std::time::Duration,
    refresh: RobotsRefresh,
    slots: Mutex<HashMap<String, Slot>>,
}

impl RobotsCache {
    /// Creates an empty cache
    ///
    /// # Arguments
    ///
    /// * `transport` - HTTP transport used for robots.txt requests
    /// * `user_agent` - User agent whose rules are evaluated
    /// * `timeout` - Upper bound for a single robots.txt fetch
    pub fn new(
        transport: Arc<dyn Transport>,
        user_agent: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Self {
        Self {
            transport,
            user_agent: user_agent.into(),
            timeout,
            refresh: RobotsRefresh::Never,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the refresh policy (default: never refresh)
    pub fn with_refresh(mut self, refresh: RobotsRefresh) -> Self {
        self.refresh = refresh;
        self
    }

    /// Returns the user agent whose rules are evaluated
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Number of origins with a cache slot
    pub fn len(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }

    /// Returns true if no origin has been looked up yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks whether robots.txt permits fetching `url`
    ///
    /// Robots fetch failures never block crawling: any non-200 answer or
    /// network error leaves the origin unrestricted.
    ///
    /// # Returns
    ///
    /// * `Ok(bool)` - Whether the URL may be fetched
    /// * `Err(UrlError)` - The URL is not an absolute http(s) URL
    pub async fn is_allowed(&self, url: &str) -> Result<bool, UrlError> {
        let parsed = parse_http_url(url)?;
        let origin = origin_of(&parsed);
        let slot = self.slot_for(&origin);

        let cached = slot
            .get_or_init(|| async { CachedRobots::new(self.fetch_policy(&origin).await) })
            .await;

        Ok(cached.content.is_allowed(parsed.as_str(), &self.user_agent))
    }

    /// Returns the slot for an origin, replacing a stale populated one
    fn slot_for(&self, origin: &str) -> Slot {
        let mut slots = match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let stale = slots
            .get(origin)
            .and_then(|slot| slot.get())
            .map(|cached| cached.is_stale(self.refresh))
            .unwrap_or(false);

        if stale {
            tracing::debug!("robots.txt for {} is stale, refetching", origin);
            slots.remove(origin);
        }

        slots
            .entry(origin.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    async fn fetch_policy(&self, origin: &str) -> ParsedRobots {
        let robots_url = format!("{}/robots.txt", origin);
        let headers = [("User-Agent".to_string(), self.user_agent.clone())];

        let result =
            tokio::time::timeout(self.timeout, self.transport.get(&robots_url, &headers)).await;

        match result {
            Ok(Ok(response)) if response.status == 200 => {
                tracing::debug!("Fetched robots.txt from {}", robots_url);
                ParsedRobots::from_content(&response.body)
            }
            Ok(Ok(response)) => {
                tracing::info!(
                    "robots.txt at {} returned HTTP {}, treating origin as unrestricted",
                    robots_url,
                    response.status
                );
                ParsedRobots::allow_all()
            }
            Ok(Err(e)) => {
                tracing::warn!("Failed to fetch robots.txt from {}: {}", robots_url, e);
                ParsedRobots::allow_all()
            }
            Err(_) => {
                tracing::warn!(
                    "Timed out after {:?} fetching robots.txt from {}",
                    self.timeout,
                    robots_url
                );
                ParsedRobots::allow_all()
            }
        }
    }
}
