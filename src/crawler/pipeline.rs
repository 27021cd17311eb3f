//! Crawl pipeline - one pass over a batch of candidate URLs
//!
//! This module ties the pieces of a crawl together:
//! - Deduplicating and normalizing candidates
//! - Skipping URLs that are still fresh in the state store
//! - Fetching the rest with conditional headers
//! - Recording outcomes, building capsules and saving artifacts
//! - Classifying fetched pages and collecting job links

use crate::capsule::{build_capsule, extract_job_links, is_thin_content, Capsule};
use crate::classify::{Classifier, ClassifyMode, CommandClassifier};
use crate::config::{CapsuleConfig, Config};
use crate::crawler::{FetchOutcome, FetchRequest, FetchResult, Fetcher};
use crate::output::{ArtifactWriter, FileArtifactWriter};
use crate::state::FetchStatus;
use crate::storage::{FetchRecord, StateStore};
use crate::url::{dedupe, normalize, NormalizedUrl};
use crate::SieveError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Reason recorded for pages with too little visible text
pub const THIN_CONTENT_REASON: &str = "thin_content";

/// Reason recorded for URLs refused by robots.txt
pub const ROBOTS_REASON: &str = "disallowed by robots.txt";

/// A job-related link found on a fetched page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredLink {
    /// Normalized link target
    pub url: String,

    /// Normalized URL of the page it was found on
    pub found_on: String,
}

/// Counts and discoveries from one pipeline run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlReport {
    /// Pages stored as `fetched` (including 304 revalidations of fetched pages)
    pub fetched: u64,

    /// Revalidations answered 304 Not Modified, counted in `fetched` or `rejected`
    pub not_modified: u64,

    /// Pages stored as `rejected` (thin or non-HTML)
    pub rejected: u64,

    /// URLs refused by robots.txt
    pub blocked: u64,

    /// URLs whose fetch failed after retries
    pub errors: u64,

    /// URLs still fresh under the TTL
    pub skipped: u64,

    /// Candidates that failed normalization
    pub invalid: u64,

    /// Pages with a stored classification
    pub classified: u64,

    /// Classification attempts that came back unavailable
    pub classification_failures: u64,

    /// Job links discovered on fetched pages, first-found order
    pub job_links: Vec<DiscoveredLink>,
}

impl CrawlReport {
    /// Number of URLs that reached the fetcher
    pub fn attempted(&self) -> u64 {
        self.fetched + self.rejected + self.blocked + self.errors
    }
}

/// URLs due for fetching, decided before any network traffic
#[derive(Debug, Clone, Default)]
pub struct CrawlPlan {
    /// Due URLs with their (possibly conditional) requests, input order
    pub due: Vec<(NormalizedUrl, FetchRequest)>,

    /// URLs still fresh under the TTL
    pub skipped: u64,

    /// Candidates that failed normalization
    pub invalid: u64,
}

/// Crawl pipeline over a fetcher and a state store
pub struct Pipeline {
    fetcher: Fetcher,
    store: Arc<dyn StateStore>,
    capsule: CapsuleConfig,
    ttl_days: u32,
    classifier: Option<Arc<dyn Classifier>>,
    classify_mode: ClassifyMode,
    artifacts: Option<Arc<dyn ArtifactWriter>>,
}

impl Pipeline {
    pub fn new(fetcher: Fetcher, store: Arc<dyn StateStore>) -> Self {
        Self {
            fetcher,
            store,
            capsule: CapsuleConfig::default(),
            ttl_days: 7,
            classifier: None,
            classify_mode: ClassifyMode::Plain,
            artifacts: None,
        }
    }

    /// Builds the full pipeline described by a configuration
    ///
    /// The classifier and the artifact writer are only attached when their
    /// sections are present.
    pub fn from_config(config: &Config, store: Arc<dyn StateStore>) -> Result<Self, SieveError> {
        let mut pipeline = Self::new(Fetcher::from_config(config)?, store)
            .with_capsule_config(config.capsule)
            .with_ttl_days(config.crawler.ttl_days);

        if let Some(classifier) = &config.classifier {
            let mode = if classifier.use_search {
                ClassifyMode::SearchAugmented
            } else {
                ClassifyMode::Plain
            };
            pipeline =
                pipeline.with_classifier(Arc::new(CommandClassifier::from_config(classifier)), mode);
        }

        if let Some(dir) = &config.output.artifact_dir {
            pipeline = pipeline.with_artifacts(Arc::new(FileArtifactWriter::new(dir)?));
        }

        Ok(pipeline)
    }

    /// Builds a pipeline that is only used for [`Pipeline::plan`]
    ///
    /// No classifier or artifact writer is attached, so nothing is created on
    /// disk.
    pub fn for_planning(config: &Config, store: Arc<dyn StateStore>) -> Result<Self, SieveError> {
        Ok(Self::new(Fetcher::from_config(config)?, store).with_ttl_days(config.crawler.ttl_days))
    }

    pub fn with_capsule_config(mut self, capsule: CapsuleConfig) -> Self {
        self.capsule = capsule;
        self
    }

    pub fn with_ttl_days(mut self, ttl_days: u32) -> Self {
        self.ttl_days = ttl_days;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>, mode: ClassifyMode) -> Self {
        self.classifier = Some(classifier);
        self.classify_mode = mode;
        self
    }

    pub fn with_artifacts(mut self, artifacts: Arc<dyn ArtifactWriter>) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// Decides which candidates are due without fetching anything
    pub fn plan<I, S>(&self, candidates: I) -> Result<CrawlPlan, SieveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut plan = CrawlPlan::default();

        for candidate in dedupe(candidates) {
            let url = match normalize(&candidate) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Skipping invalid candidate {}: {}", candidate, e);
                    plan.invalid += 1;
                    continue;
                }
            };

            if !self.store.should_fetch(&url, self.ttl_days)? {
                tracing::debug!("{} is fresh, skipping", url);
                plan.skipped += 1;
                continue;
            }

            let headers = self.store.conditional_headers(&url)?;
            let request = FetchRequest::new(url.as_str()).with_headers(headers);
            plan.due.push((url, request));
        }

        Ok(plan)
    }

    /// Runs one crawl pass over the candidates
    ///
    /// Per-URL failures are recorded and counted. Only state store failures
    /// abort the run.
    pub async fn run<I, S>(&self, candidates: I) -> Result<CrawlReport, SieveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let plan = self.plan(candidates)?;
        let mut report = CrawlReport {
            skipped: plan.skipped,
            invalid: plan.invalid,
            ..CrawlReport::default()
        };

        tracing::info!(
            "Crawl pass: {} due, {} fresh, {} invalid",
            plan.due.len(),
            plan.skipped,
            plan.invalid
        );

        let outcomes = self
            .fetcher
            .fetch_all(plan.due.iter().map(|(_, request)| request.clone()))
            .await;

        let mut seen_links: HashSet<String> = plan
            .due
            .iter()
            .map(|(url, _)| url.as_str().to_string())
            .collect();

        for ((url, _), outcome) in plan.due.iter().zip(outcomes) {
            self.record_outcome(url, outcome, &mut seen_links, &mut report)
                .await?;
        }

        tracing::info!(
            "Crawl pass done: {} fetched, {} rejected, {} blocked, {} errors, {} classified, {} job links",
            report.fetched,
            report.rejected,
            report.blocked,
            report.errors,
            report.classified,
            report.job_links.len()
        );

        Ok(report)
    }

    async fn record_outcome(
        &self,
        url: &NormalizedUrl,
        outcome: FetchOutcome,
        seen_links: &mut HashSet<String>,
        report: &mut CrawlReport,
    ) -> Result<(), SieveError> {
        match outcome.result {
            Ok(page) if page.not_modified() => {
                match self.record_not_modified(url, &page)? {
                    FetchStatus::Rejected => report.rejected += 1,
                    _ => report.fetched += 1,
                }
                report.not_modified += 1;
            }
            Ok(page) if !page.is_html() => {
                let content_type = page.content_type.clone().unwrap_or_default();
                tracing::info!("Rejecting {}: non-HTML content {}", url, content_type);
                let record = FetchRecord {
                    rejected_reason: Some(format!("non_html_content: {}", content_type)),
                    ..page_record(&page, FetchStatus::Rejected, None)
                };
                self.store.upsert_fetch(url, &record)?;
                report.rejected += 1;
            }
            Ok(page) => self.record_page(url, &page, seen_links, report).await?,
            Err(SieveError::RobotsDisallowed { .. }) => {
                self.store
                    .upsert_fetch(url, &FetchRecord::blocked(ROBOTS_REASON))?;
                report.blocked += 1;
            }
            Err(SieveError::Fetch { failure, .. }) => {
                self.store.upsert_fetch(
                    url,
                    &FetchRecord::error(failure.http_status(), failure.to_string()),
                )?;
                report.errors += 1;
            }
            Err(e) if e.is_per_url() => {
                self.store
                    .upsert_fetch(url, &FetchRecord::error(None, e.to_string()))?;
                report.errors += 1;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Stores a 304 revalidation, keeping validators the response omitted
    ///
    /// The earlier verdict still holds: a rejected page stays rejected with
    /// its reason. Returns the status that was stored.
    fn record_not_modified(
        &self,
        url: &NormalizedUrl,
        page: &FetchResult,
    ) -> Result<FetchStatus, SieveError> {
        let record = match self.store.get(url)? {
            Some(prev) => {
                let (status, rejected_reason) = match prev.status {
                    Some(FetchStatus::Rejected) => (FetchStatus::Rejected, prev.rejected_reason),
                    _ => (FetchStatus::Fetched, None),
                };
                FetchRecord {
                    etag: page.etag.clone().or(prev.etag),
                    last_modified: page.last_modified.clone().or(prev.last_modified),
                    content_type: page.content_type.clone().or(prev.content_type),
                    rejected_reason,
                    ..page_record(page, status, prev.canonical_url)
                }
            }
            None => page_record(page, FetchStatus::Fetched, None),
        };
        self.store.upsert_fetch(url, &record)?;
        tracing::debug!("{} revalidated (304) as {}", url, record.status);
        Ok(record.status)
    }

    async fn record_page(
        &self,
        url: &NormalizedUrl,
        page: &FetchResult,
        seen_links: &mut HashSet<String>,
        report: &mut CrawlReport,
    ) -> Result<(), SieveError> {
        let capsule = build_capsule(&page.body, &page.final_url, self.capsule.max_text_length);
        let thin = is_thin_content(&page.body, self.capsule.min_text_length);

        let record = if thin {
            FetchRecord {
                rejected_reason: Some(THIN_CONTENT_REASON.to_string()),
                ..page_record(page, FetchStatus::Rejected, capsule.canonical_url.clone())
            }
        } else {
            page_record(page, FetchStatus::Fetched, capsule.canonical_url.clone())
        };
        self.store.upsert_fetch(url, &record)?;

        if let Some(artifacts) = &self.artifacts {
            if let Err(e) = artifacts.write(&page.final_url, &page.body, Utc::now()) {
                tracing::warn!("Failed to save artifact for {}: {}", url, e);
            }
        }

        if thin {
            tracing::info!("Rejecting {}: thin content", url);
            report.rejected += 1;
            return Ok(());
        }
        report.fetched += 1;

        self.collect_job_links(url, page, seen_links, report);
        self.classify(url, &capsule, report).await
    }

    fn collect_job_links(
        &self,
        url: &NormalizedUrl,
        page: &FetchResult,
        seen_links: &mut HashSet<String>,
        report: &mut CrawlReport,
    ) {
        for link in extract_job_links(&page.body, &page.final_url, self.capsule.job_link_limit) {
            let Ok(target) = normalize(&link) else {
                tracing::debug!("Ignoring unusable job link {}", link);
                continue;
            };
            if seen_links.insert(target.as_str().to_string()) {
                report.job_links.push(DiscoveredLink {
                    url: target.into_string(),
                    found_on: url.as_str().to_string(),
                });
            }
        }
    }

    async fn classify(
        &self,
        url: &NormalizedUrl,
        capsule: &Capsule,
        report: &mut CrawlReport,
    ) -> Result<(), SieveError> {
        let Some(classifier) = &self.classifier else {
            return Ok(());
        };

        match classifier.classify(capsule, self.classify_mode).await {
            Ok(answer) => {
                tracing::info!(
                    "Classified {} as {} ({:.2})",
                    url,
                    answer.page_type,
                    answer.confidence
                );
                self.store.update_classification(
                    url,
                    Some(answer.page_type),
                    Some(answer.confidence),
                )?;
                report.classified += 1;
            }
            Err(e) => {
                tracing::warn!("Classification unavailable for {}: {}", url, e);
                self.store.update_classification(url, None, None)?;
                report.classification_failures += 1;
            }
        }
        Ok(())
    }
}

/// Fetch fields shared by every stored outcome of a response
fn page_record(page: &FetchResult, status: FetchStatus, canonical_url: Option<String>) -> FetchRecord {
    FetchRecord {
        final_url: Some(page.final_url.clone()),
        canonical_url,
        etag: page.etag.clone(),
        last_modified: page.last_modified.clone(),
        http_status: Some(page.status),
        content_type: page.content_type.clone(),
        ..FetchRecord::new(status)
    }
}
