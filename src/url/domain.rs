use url::Url;

/// Returns the `scheme://host[:port]` origin of a URL
///
/// Robots policies are cached per origin. Default ports are omitted by the
/// URL parser, so `https://example.com:443/` and `https://example.com/` share
/// an origin.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use job_sieve::url::origin_of;
///
/// let url = Url::parse("https://Jobs.Example.com/open/1?x=1").unwrap();
/// assert_eq!(origin_of(&url), "https://jobs.example.com");
/// ```
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Builds a filesystem-friendly source label from a URL's host
///
/// Dots are replaced by dashes (`jobs.example.com` -> `jobs-example-com`).
/// URLs without a host get the label `unknown`.
pub fn source_label(url_str: &str) -> String {
    Url::parse(url_str)
        .ok()
        .and_then(|url| url.host_str().map(|h| h.to_lowercase()))
        .map(|host| host.replace('.', "-"))
        .unwrap_or_else(|| "unknown".to_string())
}
