//! Deadline candidates and structured job-posting detection

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;

/// Maximum deadline candidates kept per capsule
pub const MAX_DEADLINES: usize = 5;

/// ISO `YYYY-MM-DD`, `D.M.YYYY`, then `D/M/YYYY`
fn deadline_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"\b(\d{4}-\d{2}-\d{2})\b",
            r"\b(\d{1,2}\.\d{1,2}\.\d{4})\b",
            r"\b(\d{1,2}/\d{1,2}/\d{4})\b",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

/// Date-like strings in pattern order, then document order
pub(crate) fn deadline_candidates(text: &str) -> Vec<String> {
    deadline_patterns()
        .iter()
        .flat_map(|pattern| {
            pattern
                .captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
        .take(MAX_DEADLINES)
        .collect()
}

/// True if any JSON-LD block contains a `JobPosting` object at any depth
pub(crate) fn has_job_posting(document: &Html) -> bool {
    let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) else {
        return false;
    };

    document.select(&selector).any(|script| {
        let raw: String = script.text().collect();
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(payload) => contains_job_posting(&payload),
            Err(e) => {
                tracing::debug!("Skipping malformed JSON-LD block: {}", e);
                false
            }
        }
    })
}

fn contains_job_posting(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            map.get("@type").and_then(Value::as_str) == Some("JobPosting")
                || map.values().any(contains_job_posting)
        }
        Value::Array(items) => items.iter().any(contains_job_posting),
        _ => false,
    }
}
