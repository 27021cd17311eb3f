//! Capsule extraction
//!
//! A capsule is the compact, classifier-ready summary of one fetched page:
//! title, meta description, first heading, a bounded text snippet, apply
//! links, deadline candidates, a structured-data flag and the canonical URL.
//! Extraction is a pure function of the HTML, the base URL and the limits.

mod links;
mod signals;
mod text;

pub use links::{extract_job_links, APPLY_KEYWORDS, JOB_LINK_KEYWORDS, MAX_APPLY_LINKS};
pub use signals::MAX_DEADLINES;
pub use text::NOISE_TAGS;

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// An anchor that looks like an application entry point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyLink {
    pub text: String,
    pub url: String,
}

/// Structured extraction from one fetched page
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capsule {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub h1: Option<String>,
    pub text_snippet: Option<String>,
    pub apply_links: Vec<ApplyLink>,
    pub deadline_candidates: Vec<String>,
    pub structured_jobposting: bool,
    pub canonical_url: Option<String>,
}

impl Capsule {
    /// Length of the text snippet in characters
    pub fn text_len(&self) -> usize {
        self.text_snippet
            .as_deref()
            .map_or(0, |text| text.chars().count())
    }
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .filter(|element| !text::inside_noise(*element))
        .map(text::element_text)
        .next()
        .filter(|text| !text.is_empty())
}

fn meta_description(document: &Html) -> Option<String> {
    let selector = Selector::parse(r#"meta[name="description"]"#).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
}

/// Builds the capsule for a page
///
/// # Arguments
///
/// * `html` - The page HTML
/// * `base_url` - URL the page was fetched from (for resolving links)
/// * `max_text_length` - Hard character cut for the text snippet
///
/// # Example
///
/// ```
/// use job_sieve::build_capsule;
///
/// let html = r#"<html><head><title>Developer</title></head>
///     <body><h1>Backend developer</h1><p>Apply by 2025-03-31.</p>
///     <a href="/apply">Apply now</a></body></html>"#;
/// let capsule = build_capsule(html, "https://example.com/jobs/1", 1200);
///
/// assert_eq!(capsule.title.as_deref(), Some("Developer"));
/// assert_eq!(capsule.deadline_candidates, vec!["2025-03-31".to_string()]);
/// assert_eq!(capsule.apply_links[0].url, "https://example.com/apply");
/// ```
pub fn build_capsule(html: &str, base_url: &str, max_text_length: usize) -> Capsule {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();

    let text_snippet = text::visible_text(&document, max_text_length);
    let deadline_candidates = text_snippet
        .as_deref()
        .map(signals::deadline_candidates)
        .unwrap_or_default();

    Capsule {
        title: first_text(&document, "title"),
        meta_description: meta_description(&document),
        h1: first_text(&document, "h1"),
        text_snippet,
        apply_links: links::apply_links(&document, base.as_ref()),
        deadline_candidates,
        structured_jobposting: signals::has_job_posting(&document),
        canonical_url: links::canonical_url(&document, base.as_ref()),
    }
}

/// Returns true if the page has less visible text than `min_text_length`
pub fn is_thin_content(html: &str, min_text_length: usize) -> bool {
    let document = Html::parse_document(html);
    let length = text::visible_text(&document, min_text_length + 1)
        .map_or(0, |text| text.chars().count());
    length < min_text_length
}
