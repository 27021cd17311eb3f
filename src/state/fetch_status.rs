/// Fetch status definitions for the URL state store
///
/// This module defines the outcome recorded for each fetch attempt.
use std::fmt;

/// Outcome of the most recent fetch of a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FetchStatus {
    /// Page was fetched and kept for classification
    Fetched,

    /// Page was fetched but filtered out (thin content, non-HTML)
    Rejected,

    /// Fetch was refused by robots.txt
    Blocked,

    /// Fetch failed after all retries
    Error,
}

impl FetchStatus {
    /// Returns true if the page was retrieved over HTTP
    ///
    /// Only these rows count as a prior fetch for TTL purposes; blocked and
    /// errored URLs stay eligible for the next run.
    pub fn is_successful_fetch(&self) -> bool {
        matches!(self, Self::Fetched | Self::Rejected)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Fetched => "fetched",
            Self::Rejected => "rejected",
            Self::Blocked => "blocked",
            Self::Error => "error",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "fetched" => Some(Self::Fetched),
            "rejected" => Some(Self::Rejected),
            "blocked" => Some(Self::Blocked),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Returns all statuses
    pub fn all() -> [Self; 4] {
        [Self::Fetched, Self::Rejected, Self::Blocked, Self::Error]
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_successful_fetch() {
        assert!(FetchStatus::Fetched.is_successful_fetch());
        assert!(FetchStatus::Rejected.is_successful_fetch());

        assert!(!FetchStatus::Blocked.is_successful_fetch());
        assert!(!FetchStatus::Error.is_successful_fetch());
    }

    #[test]
    fn test_to_db_string() {
        assert_eq!(FetchStatus::Fetched.to_db_string(), "fetched");
        assert_eq!(FetchStatus::Rejected.to_db_string(), "rejected");
        assert_eq!(FetchStatus::Blocked.to_db_string(), "blocked");
        assert_eq!(FetchStatus::Error.to_db_string(), "error");
    }

    #[test]
    fn test_from_db_string() {
        for status in FetchStatus::all() {
            assert_eq!(FetchStatus::from_db_string(status.to_db_string()), Some(status));
        }
        assert_eq!(FetchStatus::from_db_string("processed"), None);
        assert_eq!(FetchStatus::from_db_string(""), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", FetchStatus::Blocked), "blocked");
    }
}
