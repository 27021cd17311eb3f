//! Visible text extraction
//!
//! Text inside `script`, `style`, `noscript` and inline `svg` elements never
//! counts as visible. The parsed tree is not mutated; noise is skipped by
//! checking each text node's ancestors.

use scraper::{ElementRef, Html, Node};

/// Elements whose content is never visible text
pub const NOISE_TAGS: [&str; 4] = ["script", "style", "noscript", "svg"];

fn is_noise(node: &Node) -> bool {
    node.as_element()
        .is_some_and(|element| NOISE_TAGS.contains(&element.name()))
}

/// Returns true if the element or any ancestor is a noise element
pub fn inside_noise(element: ElementRef<'_>) -> bool {
    NOISE_TAGS.contains(&element.value().name())
        || element.ancestors().any(|node| is_noise(node.value()))
}

/// Non-empty, trimmed text nodes below `element` in document order
pub fn stripped_strings<'a>(element: ElementRef<'a>) -> impl Iterator<Item = &'a str> + 'a {
    element
        .descendants()
        .filter_map(|node| node.value().as_text().map(|text| (node, text)))
        .filter(|(node, _)| !node.ancestors().any(|a| is_noise(a.value())))
        .map(|(_, text)| text.trim())
        .filter(|text| !text.is_empty())
}

/// Text of an element with its text nodes joined by single spaces
pub fn element_text(element: ElementRef<'_>) -> String {
    stripped_strings(element).collect::<Vec<_>>().join(" ")
}

/// Visible text of a document, cut at `max_chars` characters
///
/// Returns `None` when the document has no visible text.
pub fn visible_text(document: &Html, max_chars: usize) -> Option<String> {
    let mut chunks = Vec::new();
    let mut total = 0;

    for chunk in stripped_strings(document.root_element()) {
        chunks.push(chunk);
        total += chunk.chars().count() + 1;
        if total >= max_chars {
            break;
        }
    }

    if chunks.is_empty() {
        return None;
    }

    let text: String = chunks.join(" ").chars().take(max_chars).collect();
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    #[test]
    fn test_noise_excluded() {
        let html = Html::parse_document(
            r#"<html><head><style>body { color: red }</style></head>
            <body><p>Hello</p><script>var x = 1;</script>
            <noscript>Enable JS</noscript><svg><text>icon</text></svg><p>world</p></body></html>"#,
        );
        assert_eq!(visible_text(&html, 1000).as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_hard_character_cut() {
        let html = Html::parse_document("<p>abcdef</p><p>ghijkl</p>");
        assert_eq!(visible_text(&html, 9).as_deref(), Some("abcdef gh"));
    }

    #[test]
    fn test_cut_counts_characters_not_bytes() {
        let html = Html::parse_document("<p>työpaikat ääkköset</p>");
        assert_eq!(visible_text(&html, 4).as_deref(), Some("työp"));
    }

    #[test]
    fn test_empty_document() {
        let html = Html::parse_document("<html><body>   </body></html>");
        assert_eq!(visible_text(&html, 100), None);
    }

    #[test]
    fn test_element_text_joins_nodes() {
        let html = Html::parse_document(r#"<a href="/x">Apply <b>now</b></a>"#);
        let selector = Selector::parse("a").unwrap();
        let anchor = html.select(&selector).next().unwrap();
        assert_eq!(element_text(anchor), "Apply now");
    }

    #[test]
    fn test_inside_noise() {
        let html = Html::parse_document(r#"<svg><g></g></svg><p>text</p>"#);
        let svg = Selector::parse("svg").unwrap();
        let p = Selector::parse("p").unwrap();
        assert!(inside_noise(html.select(&svg).next().unwrap()));
        assert!(!inside_noise(html.select(&p).next().unwrap()));
    }
}
