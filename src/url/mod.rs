//! URL handling module for Job-Sieve
//!
//! This module provides URL normalization (the state-store key), fragment
//! stripping, relative resolution, lazy deduplication, and origin helpers.

mod dedupe;
mod domain;
mod normalize;

pub use dedupe::{dedupe, Dedupe};
pub use domain::{origin_of, source_label};
pub use normalize::{normalize, parse_http_url, resolve, strip_fragment, NormalizedUrl};
