//! HTTP transport abstraction
//!
//! The fetcher and the robots cache talk to the network only through the
//! [`Transport`] trait, so tests can swap in a stub. [`ReqwestTransport`] is
//! the production implementation backed by one shared `reqwest::Client`.

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderName, CONTENT_TYPE, ETAG, LAST_MODIFIED};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;

/// Transport-level failure (no HTTP status was obtained)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            Self::Body(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// A fully read HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// URL after following redirects
    pub final_url: String,

    /// HTTP status code
    pub status: u16,

    /// Content-Type header value
    pub content_type: Option<String>,

    /// ETag header value
    pub etag: Option<String>,

    /// Last-Modified header value
    pub last_modified: Option<String>,

    /// Response body decoded as text
    pub body: String,
}

impl HttpResponse {
    /// Returns true for 2xx responses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal HTTP GET capability shared by the fetcher and the robots cache
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues a GET request with the given extra headers
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<HttpResponse, TransportError>;
}

/// Formats the identifying user agent string
///
/// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn format_user_agent(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds the shared HTTP client
///
/// Redirects are followed (up to 10 hops) so the final URL is what gets
/// recorded in the state store.
///
/// # Example
///
/// ```no_run
/// use job_sieve::config::UserAgentConfig;
/// use job_sieve::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "JobSieve".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(format_user_agent(config))
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Transport`] backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;

        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };
        let content_type = header(CONTENT_TYPE);
        let etag = header(ETAG);
        let last_modified = header(LAST_MODIFIED);
        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        let body = response.text().await?;

        Ok(HttpResponse {
            final_url,
            status,
            content_type,
            etag,
            last_modified,
            body,
        })
    }
}
