//! Job-Sieve main entry point
//!
//! This is the command-line interface for the Job-Sieve crawl engine.

use anyhow::{bail, Context};
use clap::Parser;
use job_sieve::config::{load_config_with_hash, Config};
use job_sieve::crawler::{read_candidates, CrawlReport, Pipeline};
use job_sieve::output::{load_statistics, print_statistics, write_links_jsonl};
use job_sieve::storage::{inspect_state_store, open_state_store, StateStore};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Job-Sieve: a polite crawl-and-prefilter engine for job postings
///
/// Job-Sieve fetches candidate URLs while respecting robots.txt, keeps a
/// per-URL state store so fresh pages are not refetched, and reduces each
/// page to a compact capsule for classification.
#[derive(Parser, Debug)]
#[command(name = "job-sieve")]
#[command(version)]
#[command(about = "A polite crawl-and-prefilter engine for job postings", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Candidate URLs, one per line (bare URL or JSON with a `url` field)
    #[arg(short, long, value_name = "FILE", required_unless_present = "stats")]
    input: Option<PathBuf>,

    /// Write discovered job links to this file as JSONL
    #[arg(long, value_name = "FILE", conflicts_with_all = ["dry_run", "stats"])]
    links_out: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show which candidates are due without fetching
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the state store and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.stats {
        return handle_stats(&config);
    }

    let Some(input) = cli.input.as_deref() else {
        bail!("--input is required");
    };
    let candidates = load_candidates(input)?;
    tracing::info!("Read {} candidate(s) from {}", candidates.len(), input.display());

    if cli.dry_run {
        handle_dry_run(&config, &candidates)
    } else {
        handle_crawl(&config, &candidates, cli.links_out.as_deref()).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("job_sieve=info,warn"),
            1 => EnvFilter::new("job_sieve=debug,info"),
            2 => EnvFilter::new("job_sieve=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_candidates(path: &Path) -> anyhow::Result<Vec<String>> {
    let file =
        File::open(path).with_context(|| format!("failed to open input {}", path.display()))?;
    read_candidates(BufReader::new(file))
        .with_context(|| format!("failed to read input {}", path.display()))
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn StateStore>> {
    let path = Path::new(&config.output.database_path);
    let store = open_state_store(path)
        .with_context(|| format!("failed to open state store {}", path.display()))?;
    let store: Arc<dyn StateStore> = Arc::new(store);
    Ok(store)
}

/// Opens the state store without creating or changing anything on disk
fn inspect_store(config: &Config) -> anyhow::Result<Arc<dyn StateStore>> {
    let path = Path::new(&config.output.database_path);
    let store = inspect_state_store(path)
        .with_context(|| format!("failed to open state store {}", path.display()))?;
    let store: Arc<dyn StateStore> = Arc::new(store);
    Ok(store)
}

/// Handles the --dry-run mode: shows configuration and the crawl plan
fn handle_dry_run(config: &Config, candidates: &[String]) -> anyhow::Result<()> {
    println!("=== Job-Sieve Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Retries: {}", config.crawler.retries);
    println!("  Timeout: {}s", config.crawler.timeout_secs);
    println!("  Robots mode: {:?}", config.crawler.robots_mode);
    println!("  TTL: {} day(s)", config.crawler.ttl_days);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    match &config.output.artifact_dir {
        Some(dir) => println!("  Artifacts: {}", dir.display()),
        None => println!("  Artifacts: (disabled)"),
    }

    match &config.classifier {
        Some(classifier) => println!(
            "\nClassifier: {} --model {}{}",
            classifier.program,
            classifier.model,
            if classifier.use_search { " --search" } else { "" }
        ),
        None => println!("\nClassifier: (disabled)"),
    }

    let pipeline = Pipeline::for_planning(config, inspect_store(config)?)?;
    let plan = pipeline.plan(candidates)?;

    println!("\nCandidates ({}):", candidates.len());
    println!("  Due: {}", plan.due.len());
    println!("  Fresh (skipped): {}", plan.skipped);
    println!("  Invalid: {}", plan.invalid);
    for (url, request) in &plan.due {
        let marker = if request.is_conditional() { " (conditional)" } else { "" };
        println!("    * {}{}", url, marker);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would fetch {} URL(s)", plan.due.len());

    Ok(())
}

/// Handles the --stats mode: shows statistics from the state store
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let store = inspect_store(config)?;
    let stats = load_statistics(store.as_ref())?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    candidates: &[String],
    links_out: Option<&Path>,
) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(config, open_store(config)?)?;

    let report = match pipeline.run(candidates).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    print_report(&report);

    if let Some(path) = links_out {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        write_links_jsonl(&report.job_links, BufWriter::new(file))?;
        tracing::info!(
            "Wrote {} job link(s) to {}",
            report.job_links.len(),
            path.display()
        );
    }

    Ok(())
}

fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");
    println!("  Fetched: {} ({} not modified)", report.fetched, report.not_modified);
    println!("  Rejected: {}", report.rejected);
    println!("  Blocked: {}", report.blocked);
    println!("  Errors: {}", report.errors);
    println!("  Skipped (fresh): {}", report.skipped);
    println!("  Invalid: {}", report.invalid);
    println!(
        "  Classified: {} ({} unavailable)",
        report.classified, report.classification_failures
    );
    println!("  Job links found: {}", report.job_links.len());
}
