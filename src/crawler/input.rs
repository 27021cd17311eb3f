//! Candidate URL input
//!
//! Accepts one candidate per line, either a bare URL or a JSON object with a
//! `url` field. Blank lines and `#` comments are ignored.

use serde::Deserialize;
use std::io::BufRead;

#[derive(Deserialize)]
struct CandidateLine {
    url: String,
}

/// Parses one input line into a candidate URL
///
/// # Examples
///
/// ```
/// use job_sieve::crawler::parse_candidate_line;
///
/// assert_eq!(
///     parse_candidate_line(r#"{"url": "https://example.com/jobs", "rank": 3}"#).as_deref(),
///     Some("https://example.com/jobs")
/// );
/// assert_eq!(parse_candidate_line("  https://example.com/a ").as_deref(), Some("https://example.com/a"));
/// assert_eq!(parse_candidate_line("   "), None);
/// ```
pub fn parse_candidate_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    if line.starts_with('{') {
        return match serde_json::from_str::<CandidateLine>(line) {
            Ok(candidate) => Some(candidate.url.trim().to_string()).filter(|u| !u.is_empty()),
            Err(e) => {
                tracing::warn!("Ignoring malformed input line: {}", e);
                None
            }
        };
    }

    Some(line.to_string())
}

/// Reads all candidates from a line-oriented source
pub fn read_candidates<R: BufRead>(reader: R) -> std::io::Result<Vec<String>> {
    let mut candidates = Vec::new();
    for line in reader.lines() {
        if let Some(candidate) = parse_candidate_line(&line?) {
            candidates.push(candidate);
        }
    }
    Ok(candidates)
}
