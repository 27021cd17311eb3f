use crate::UrlError;
use std::fmt;
use url::form_urlencoded::byte_serialize;
use url::Url;

/// Tracking query parameters removed during normalization
///
/// Any parameter starting with `utm_` is removed as well.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "gclid",
    "fbclid",
    "yclid",
    "mc_cid",
    "mc_eid",
    "igshid",
    "msclkid",
];

/// Canonical string form of a URL, used as the deduplication and state key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    /// Returns the normalized URL as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the inner string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Parses an absolute http(s) URL
///
/// # Returns
///
/// * `Ok(Url)` - The parsed URL
/// * `Err(UrlError)` - The input has no scheme, no host, or a non-HTTP scheme
pub fn parse_http_url(url_str: &str) -> Result<Url, UrlError> {
    let trimmed = url_str.trim();
    let url = Url::parse(trimmed).map_err(|e| UrlError::Parse(format!("{}: {}", trimmed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlError::MissingHost(trimmed.to_string())),
    }
}

/// Normalizes a URL into its canonical key form
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if it has no scheme or host, or is not http(s)
/// 2. Lowercase scheme and host (done by the parser)
/// 3. Default an empty path to `/`
/// 4. Lowercase query parameter names, drop tracking parameters
/// 5. Sort remaining parameters by name, then value
/// 6. Remove the fragment
///
/// Normalization is idempotent: normalizing a normalized URL returns it
/// unchanged.
///
/// # Examples
///
/// ```
/// use job_sieve::url::normalize;
///
/// let url = normalize("HTTPS://Example.COM?b=2&A=1&utm_source=x#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/?a=1&b=2");
/// ```
pub fn normalize(url_str: &str) -> Result<NormalizedUrl, UrlError> {
    let mut url = parse_http_url(url_str)?;

    if url.path().is_empty() {
        url.set_path("/");
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let query = normalize_query(&url);
        if query.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&query));
        }
    }

    Ok(NormalizedUrl(url.to_string()))
}

/// Removes only the fragment from a URL
///
/// Used where full normalization would be too aggressive, such as links
/// extracted from a page. Strings that do not parse as URLs are cut at the
/// first `#`.
pub fn strip_fragment(url_str: &str) -> String {
    match Url::parse(url_str) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => match url_str.split_once('#') {
            Some((before, _)) => before.to_string(),
            None => url_str.to_string(),
        },
    }
}

/// Resolves a possibly relative reference against a base URL
pub fn resolve(base: &str, relative: &str) -> Result<String, UrlError> {
    let base = Url::parse(base).map_err(|e| UrlError::Parse(format!("{}: {}", base, e)))?;
    base.join(relative.trim())
        .map(|url| url.to_string())
        .map_err(|e| UrlError::Parse(format!("{}: {}", relative, e)))
}

/// Filters out tracking parameters and sorts the rest into a query string
fn normalize_query(url: &Url) -> String {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.to_lowercase(), v.into_owned()))
        .filter(|(key, _)| !key.is_empty() && !is_tracking_param(key))
        .collect();

    params.sort();

    params
        .iter()
        .map(|(key, value)| {
            let key: String = byte_serialize(key.as_bytes()).collect();
            if value.is_empty() {
                key
            } else {
                let value: String = byte_serialize(value.as_bytes()).collect();
                format!("{}={}", key, value)
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Checks if a (lowercased) query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
