//! Anchor-based extraction: apply links, job links, canonical URL

use crate::capsule::text::{element_text, inside_noise};
use crate::capsule::ApplyLink;
use crate::url::strip_fragment;
use scraper::{ElementRef, Html, Selector};
use url::form_urlencoded::byte_serialize;
use url::Url;

/// Anchor text fragments that signal an application entry point
pub const APPLY_KEYWORDS: [&str; 9] = [
    "apply",
    "hakemus",
    "hae",
    "haku",
    "rekry",
    "careers",
    "open positions",
    "työpaikat",
    "uramahdollisuudet",
];

/// Text or path fragments that mark a link as job-related
pub const JOB_LINK_KEYWORDS: [&str; 8] = [
    "job",
    "jobs",
    "career",
    "positions",
    "vacancy",
    "rekry",
    "tyopaikat",
    "työpaikat",
];

/// Maximum apply links kept per capsule
pub const MAX_APPLY_LINKS: usize = 5;

/// Resolves an href against the page URL and drops the fragment
///
/// Without a usable base the href is kept as written.
pub(crate) fn resolve_href(base: Option<&Url>, href: &str) -> String {
    let href = href.trim();
    let resolved = match base {
        Some(base) => base
            .join(href)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| href.to_string()),
        None => href.to_string(),
    };
    strip_fragment(&resolved)
}

/// Visible anchors with a non-empty href, in document order
fn anchors(document: &Html) -> Vec<(ElementRef<'_>, &str)> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter(|anchor| !inside_noise(*anchor))
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            (!href.trim().is_empty()).then_some((anchor, href))
        })
        .collect()
}

/// Anchors whose text contains an apply keyword, first five in document order
pub(crate) fn apply_links(document: &Html, base: Option<&Url>) -> Vec<ApplyLink> {
    anchors(document)
        .into_iter()
        .filter_map(|(anchor, href)| {
            let text = element_text(anchor);
            let lowered = text.to_lowercase();
            APPLY_KEYWORDS
                .iter()
                .any(|keyword| lowered.contains(keyword))
                .then(|| ApplyLink {
                    text,
                    url: resolve_href(base, href),
                })
        })
        .take(MAX_APPLY_LINKS)
        .collect()
}

/// Canonical URL from `<link rel="canonical">`, resolved and fragment-free
pub(crate) fn canonical_url(document: &Html, base: Option<&Url>) -> Option<String> {
    let selector = Selector::parse("link[rel='canonical'][href]").ok()?;

    document
        .select(&selector)
        .filter_map(|link| link.value().attr("href"))
        .find(|href| !href.trim().is_empty())
        .map(|href| resolve_href(base, href))
}

fn keyword_in_path(candidate: &str) -> bool {
    let Ok(url) = Url::parse(candidate) else {
        return false;
    };
    let path = url.path().to_lowercase();

    JOB_LINK_KEYWORDS.iter().any(|keyword| {
        if path.contains(keyword) {
            return true;
        }
        // Non-ASCII keywords appear percent-encoded in parsed paths
        let encoded: String = byte_serialize(keyword.as_bytes()).collect();
        encoded != *keyword && path.contains(&encoded.to_lowercase())
    })
}

/// Collects job-related links from a page
///
/// A link qualifies when its text or its resolved path contains a job
/// keyword. Results are fragment-free and in first-found order.
///
/// # Arguments
///
/// * `html` - The page HTML
/// * `base_url` - URL the page was fetched from
/// * `limit` - Maximum number of links returned
///
/// # Example
///
/// ```
/// use job_sieve::extract_job_links;
///
/// let html = r#"<a href="/ura">Ura ja työpaikat</a><a href="/about">About</a>"#;
/// let links = extract_job_links(html, "https://example.fi/", 50);
/// assert_eq!(links, vec!["https://example.fi/ura".to_string()]);
/// ```
pub fn extract_job_links(html: &str, base_url: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();

    anchors(&document)
        .into_iter()
        .filter_map(|(anchor, href)| {
            let text = element_text(anchor).to_lowercase();
            let candidate = resolve_href(base.as_ref(), href);
            let matched = JOB_LINK_KEYWORDS
                .iter()
                .any(|keyword| text.contains(keyword))
                || keyword_in_path(&candidate);
            matched.then_some(candidate)
        })
        .take(limit)
        .collect()
}
