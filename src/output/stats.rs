//! Statistics generation from the state store
//!
//! This module provides functionality for extracting and displaying
//! per-status and per-classification counts.

use crate::state::FetchStatus;
use crate::storage::StateStore;
use crate::SieveError;
use std::collections::BTreeMap;

/// State store statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Total number of URLs with a state row
    pub total_urls: u64,

    /// Count of URLs by fetch status
    pub urls_by_status: BTreeMap<String, u64>,

    /// Count of URLs by classification type (`unset` when unclassified)
    pub urls_by_classification: BTreeMap<String, u64>,
}

impl CrawlStatistics {
    /// Count for one status
    pub fn status_count(&self, status: FetchStatus) -> u64 {
        self.urls_by_status
            .get(status.to_db_string())
            .copied()
            .unwrap_or(0)
    }
}

/// Loads statistics from the state store
///
/// # Arguments
///
/// * `store` - The state store to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(SieveError)` - Failed to query statistics
pub fn load_statistics(store: &dyn StateStore) -> Result<CrawlStatistics, SieveError> {
    let urls_by_status = store.status_counts()?;
    let urls_by_classification = store.classification_counts()?;
    let total_urls = urls_by_status.values().sum();

    Ok(CrawlStatistics {
        total_urls,
        urls_by_status,
        urls_by_classification,
    })
}

fn percentage(count: u64, total: u64) -> f64 {
    if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

fn sorted_by_count(counts: &BTreeMap<String, u64>) -> Vec<(&String, &u64)> {
    let mut sorted: Vec<_> = counts.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    sorted
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl State Statistics ===\n");

    println!("Overview:");
    println!("  Total URLs tracked: {}", stats.total_urls);
    println!();

    println!("URLs by Status:");
    for (status, count) in sorted_by_count(&stats.urls_by_status) {
        println!(
            "  {}: {} ({:.1}%)",
            status,
            count,
            percentage(*count, stats.total_urls)
        );
    }
    println!();

    if !stats.urls_by_classification.is_empty() {
        println!("URLs by Classification:");
        for (kind, count) in sorted_by_count(&stats.urls_by_classification) {
            println!(
                "  {}: {} ({:.1}%)",
                kind,
                count,
                percentage(*count, stats.total_urls)
            );
        }
        println!();
    }

    let fetched = stats.status_count(FetchStatus::Fetched);
    println!(
        "Fetch Rate: {:.1}% ({} / {} URLs fetched)",
        percentage(fetched, stats.total_urls),
        fetched,
        stats.total_urls
    );
}
