//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{CrawlJob, NewPage, PageRecord, PayloadKind};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Crawl job not found: {0}")]
    CrawlNotFound(i64),

    #[error("Column {table}.{column} cannot be queried")]
    UnknownColumn { table: String, column: String },

    #[error("Page duration of {0} seconds is out of range")]
    InvalidDuration(f64),

    #[error("Storage lock poisoned by a panicked task")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This is the only place query text is composed; the crawl engine talks to
/// storage exclusively through these operations.
pub trait Storage {
    // ===== Transactions =====

    /// Opens a write transaction
    fn begin(&mut self) -> StorageResult<()>;

    /// Commits the open transaction
    fn commit(&mut self) -> StorageResult<()>;

    /// Discards the open transaction
    fn rollback(&mut self) -> StorageResult<()>;

    // ===== Generic Lookups =====

    /// Checks whether any row of `table` has `column = value`
    ///
    /// Only columns listed in the schema's queryable set are accepted.
    fn record_exists(&self, table: &str, column: &str, value: &str) -> StorageResult<bool>;

    // ===== Crawl Jobs =====

    /// Creates a crawl job and returns its id
    ///
    /// # Arguments
    ///
    /// * `start_urls` - Seed URLs of the run (stored comma-separated)
    /// * `keyword` - Keyword label of the run
    /// * `total_page` - Initial page count (normally 0)
    /// * `duration` - Initial duration (normally the configured budget or zero)
    fn insert_crawl_job(
        &mut self,
        start_urls: &[String],
        keyword: &str,
        total_page: u64,
        duration: Duration,
    ) -> StorageResult<i64>;

    /// Records final totals for a crawl job
    fn update_crawl_job(
        &mut self,
        crawl_id: i64,
        total_pages: u64,
        duration: Duration,
    ) -> StorageResult<()>;

    /// Gets a crawl job by id
    fn get_crawl_job(&self, crawl_id: i64) -> StorageResult<CrawlJob>;

    // ===== Pages =====

    /// Inserts a page unless its URL is already stored
    ///
    /// # Returns
    ///
    /// * `Some(id)` - The new page id
    /// * `None` - A page with this URL already exists; nothing was written
    fn insert_page(&mut self, page: &NewPage) -> StorageResult<Option<i64>>;

    /// Sets the elapsed crawl time of a page
    fn update_page_duration(&mut self, page_id: i64, duration: Duration) -> StorageResult<()>;

    /// Sets the promoted flag; owned by the ranking side, the crawler only writes `false`
    fn set_hot_url(&mut self, page_id: i64, hot: bool) -> StorageResult<()>;

    /// Every URL stored in `page_information`, across all runs
    fn list_visited_urls(&self) -> StorageResult<Vec<String>>;

    /// Lists pages in id order, optionally paged
    ///
    /// Paging applies only when both `start` and `length` are given.
    fn list_pages(&self, start: Option<u64>, length: Option<u64>)
        -> StorageResult<Vec<PageRecord>>;

    /// Gets the pages with the given ids (missing ids are skipped)
    fn get_pages_by_ids(&self, ids: &[i64]) -> StorageResult<Vec<PageRecord>>;

    /// Counts pages persisted under a crawl job
    fn count_pages_for_crawl(&self, crawl_id: i64) -> StorageResult<u64>;

    // ===== Links, Tags, Payloads =====

    /// Records one outgoing link of a page
    fn insert_link(&mut self, page_id: i64, url: &str) -> StorageResult<()>;

    /// Records one tag of a page
    fn insert_tag(&mut self, page_id: i64, tag: &str) -> StorageResult<()>;

    /// Records one auxiliary payload of a page
    fn insert_payload(&mut self, page_id: i64, kind: PayloadKind, payload: &str)
        -> StorageResult<()>;

    /// Outgoing links of a page in insertion order
    fn list_links(&self, page_id: i64) -> StorageResult<Vec<String>>;

    /// Tags of a page in insertion order
    fn list_tags(&self, page_id: i64) -> StorageResult<Vec<String>>;

    /// Auxiliary payloads of a page in insertion order
    fn list_payloads(&self, page_id: i64, kind: PayloadKind) -> StorageResult<Vec<String>>;
}
