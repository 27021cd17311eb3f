//! Output module for crawl artifacts and reports
//!
//! This module handles:
//! - Saving raw fetched pages with sidecar metadata
//! - Writing discovered job links as JSONL
//! - Loading and printing state store statistics

mod artifact;
pub mod stats;
mod traits;

pub use artifact::FileArtifactWriter;
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use traits::{ArtifactMeta, ArtifactRecord, ArtifactWriter, OutputError, OutputResult};

use crate::crawler::DiscoveredLink;
use std::io::Write;

/// Writes discovered links as one JSON object per line
///
/// # Arguments
///
/// * `links` - Links to write, in report order
/// * `out` - Destination writer
pub fn write_links_jsonl<W: Write>(links: &[DiscoveredLink], mut out: W) -> OutputResult<()> {
    for link in links {
        serde_json::to_writer(&mut out, link)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
