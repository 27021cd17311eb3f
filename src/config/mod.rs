//! Configuration module for Job-Sieve
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use job_sieve::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Refetching after {} days", config.crawler.ttl_days);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    CapsuleConfig, ClassifierConfig, Config, CrawlerConfig, OutputConfig, UserAgentConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
