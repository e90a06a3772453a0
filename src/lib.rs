//! Ladang: a focused web crawler
//!
//! Starting from seed URLs, the crawler follows links on whitelisted sites for a fixed
//! time budget. Each page's text, metadata, tags and outgoing links are stored in SQLite
//! for a downstream ranking job to read.
//!
//! The [`crawler::Coordinator`] runs a crawl; [`service`] wraps the operations an outer
//! layer needs (start a crawl, page listings, bulk import).

pub mod config;
pub mod crawler;
pub mod service;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Anything that can stop a crawl operation
#[derive(Debug, Error)]
pub enum LadangError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not build HTTP client: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage failure: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Rejected URL: {0}")]
    UrlError(#[from] UrlError),

    #[error("Unparseable URL: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Could not extract {url}: {source}")]
    Extract {
        url: String,
        source: crawler::ExtractError,
    },

    #[error("Worker pool error: {0}")]
    Pool(#[from] crawler::PoolError),

    #[error("Crawl task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid import bundle for {url}: {reason}")]
    Import { url: String, reason: String },

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Problems with a crawl profile
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read profile: {0}")]
    Io(#[from] std::io::Error),

    #[error("Profile is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0}")]
    Validation(String),

    #[error("Bad seed: {0}")]
    InvalidUrl(String),

    #[error("Bad selector: {0}")]
    InvalidSelector(String),
}

/// Reasons a URL cannot be crawled
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Cannot parse URL: {0}")]
    Parse(String),

    #[error("Scheme '{0}' is not crawlable")]
    InvalidScheme(String),

    #[error("URL has no host")]
    MissingHost,
}

pub type Result<T> = std::result::Result<T, LadangError>;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

pub type UrlResult<T> = std::result::Result<T, UrlError>;

pub use config::Config;
pub use crawler::{Coordinator, CrawlReport, Frontier, WorkerPool};
pub use service::{start_crawl, CrawlHandle};
pub use storage::{SqliteStorage, Storage};
pub use url::{domain_token, is_valid_url, resolve_link};
