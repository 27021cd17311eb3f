//! Robots.txt handling module
//!
//! This module fetches, parses, and caches robots.txt policies per origin.
//! Whether a denial fails the fetch or is only logged is decided by the
//! caller through [`RobotsMode`].

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache, RobotsRefresh};
pub use parser::ParsedRobots;

use serde::Deserialize;

/// How robots.txt denials are acted upon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotsMode {
    /// A denied URL fails with `RobotsDisallowed`
    #[default]
    Enforce,

    /// A denied URL is logged and fetched anyway
    Advise,
}
