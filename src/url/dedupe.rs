use crate::url::normalize::{normalize, strip_fragment};
use std::collections::HashSet;

/// Lazy iterator yielding each URL once, keyed by its normalized form
///
/// Created by [`dedupe`]. The original strings are yielded unchanged.
#[derive(Debug)]
pub struct Dedupe<I> {
    inner: I,
    seen: HashSet<String>,
}

impl<I, S> Iterator for Dedupe<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        for candidate in self.inner.by_ref() {
            let url = candidate.as_ref();
            if url.trim().is_empty() {
                continue;
            }

            // Unparseable inputs still dedupe on their exact text; they fail
            // later at normalization.
            let key = normalize(&strip_fragment(url))
                .map(|n| n.into_string())
                .unwrap_or_else(|_| url.trim().to_string());

            if self.seen.insert(key) {
                return Some(url.to_string());
            }
        }
        None
    }
}

/// Yields each input URL once, suppressing later URLs that normalize to an
/// already seen key
///
/// # Examples
///
/// ```
/// use job_sieve::url::dedupe;
///
/// let urls = vec![
///     "https://Example.com/jobs?utm_source=feed",
///     "https://example.com/jobs#top",
///     "https://example.com/other",
/// ];
/// let unique: Vec<String> = dedupe(urls).collect();
/// assert_eq!(
///     unique,
///     vec!["https://Example.com/jobs?utm_source=feed", "https://example.com/other"]
/// );
/// ```
pub fn dedupe<I>(urls: I) -> Dedupe<I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    Dedupe {
        inner: urls.into_iter(),
        seen: HashSet::new(),
    }
}
