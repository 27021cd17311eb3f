//! Robots.txt rule evaluation
//!
//! Thin wrapper over the `robotstxt` crate's matcher.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt policy for one origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
}

impl ParsedRobots {
    /// Creates a policy from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Creates a permissive policy
    ///
    /// Used whenever robots.txt cannot be fetched or is not served with 200.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
        }
    }

    /// Returns true if this policy permits everything
    pub fn is_unrestricted(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - The absolute URL to check
    /// * `user_agent` - The user agent string (product token is matched)
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.is_unrestricted() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, product_token(user_agent), url)
    }
}

/// Extracts the product token (`JobSieve` from `JobSieve/0.1 (+...)`)
fn product_token(user_agent: &str) -> &str {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .find(|s| !s.is_empty())
        .unwrap_or(user_agent)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UA: &str = "TestBot/1.0 (+https://example.com/about; admin@example.com)";

    #[test]
    fn test_allow_all() {
        let robots = ParsedRobots::allow_all();
        assert!(robots.is_allowed("https://example.com/admin", UA));
    }

    #[test]
    fn test_parse_disallow_all() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /");
        assert!(!robots.is_allowed("https://example.com/", UA));
        assert!(!robots.is_allowed("https://example.com/jobs", UA));
    }

    #[test]
    fn test_parse_disallow_specific() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /admin");
        assert!(robots.is_allowed("https://example.com/jobs", UA));
        assert!(!robots.is_allowed("https://example.com/admin/users", UA));
    }

    #[test]
    fn test_parse_allow_and_disallow() {
        let robots =
            ParsedRobots::from_content("User-agent: *\nDisallow: /private\nAllow: /private/public");
        assert!(!robots.is_allowed("https://example.com/private", UA));
        assert!(robots.is_allowed("https://example.com/private/public", UA));
    }

    #[test]
    fn test_specific_user_agent_group() {
        let robots =
            ParsedRobots::from_content("User-agent: TestBot\nDisallow: /\n\nUser-agent: *\nAllow: /");
        assert!(!robots.is_allowed("https://example.com/page", UA));
        assert!(robots.is_allowed("https://example.com/page", "OtherBot/2.0"));
    }

    #[test]
    fn test_garbage_allows_everything() {
        let robots = ParsedRobots::from_content("This is not valid robots.txt {{{");
        assert!(robots.is_allowed("https://example.com/any/path", UA));
    }

    #[test]
    fn test_product_token() {
        assert_eq!(product_token(UA), "TestBot");
        assert_eq!(product_token("Plain"), "Plain");
    }
}
