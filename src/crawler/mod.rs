//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The frontier and its ordering strategies
//! - HTTP fetching
//! - Content extraction
//! - The bounded worker pool
//! - The per-URL scrape pipeline
//! - Overall crawl coordination

mod coordinator;
mod extractor;
mod fetcher;
mod frontier;
mod pipeline;
mod pool;
mod strategy;

pub use coordinator::{Coordinator, CrawlReport, CrawlState, StopReason};
pub use extractor::{
    canonicalize_text, extract_page, visible_text, ExtractError, ExtractedPage, MISSING_META,
};
pub use fetcher::{build_http_client, fetch_page, FetchResult};
pub use frontier::{Claim, Frontier};
pub use pipeline::{PageOutcome, ScrapePipeline};
pub use pool::{Job, PoolError, ShutdownPolicy, WorkerPool};
pub use strategy::{count_keyword, order_for, BreadthFirst, FrontierOrder, KeywordPriority};
