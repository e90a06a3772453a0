//! Configuration module for the crawler
//!
//! A crawl is driven by one TOML profile: worker and budget settings, the user agent,
//! the database path, seeds and whitelist, and per-site extraction selectors.
//!
//! # Example
//!
//! ```no_run
//! use ladang_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("{} seeds, {} workers", config.crawl.seeds.len(), config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlConfig, CrawlProfile, CrawlStrategy, CrawlerConfig, OutputConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, hash_config_text, load_config, load_config_with_hash, parse_config,
};
pub use validation::validate;
