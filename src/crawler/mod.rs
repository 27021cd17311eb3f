//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The HTTP transport seam and its reqwest implementation
//! - Robots-aware concurrent fetching with retry logic
//! - Reading candidate URLs from line-oriented input
//! - The crawl pipeline tying fetching to capsules and the state store

mod fetcher;
mod input;
mod pipeline;
mod transport;

pub use fetcher::{FetchFailure, FetchOutcome, FetchRequest, FetchResult, FetchSettings, Fetcher};
pub use input::{parse_candidate_line, read_candidates};
pub use pipeline::{
    CrawlPlan, CrawlReport, DiscoveredLink, Pipeline, ROBOTS_REASON, THIN_CONTENT_REASON,
};
pub use transport::{
    build_http_client, format_user_agent, HttpResponse, ReqwestTransport, Transport,
    TransportError,
};
