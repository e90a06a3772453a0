//! Storage module for persisting crawl output
//!
//! This module is the persistence gateway of the crawler. It owns every query the
//! engine needs:
//! - Crawl job bookkeeping
//! - Page records, outgoing links and tags
//! - Auxiliary page payloads (forms, images, lists, scripts, styles, tables)
//! - Read paths used by outer layers (paged listing, lookup by id)

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Storage shared between the coordinator and every scrape task
pub type SharedStorage = Arc<Mutex<dyn Storage + Send>>;

/// Opens (or creates) the SQLite database at `path` and wraps it for sharing
pub fn open_storage(path: &Path) -> StorageResult<SharedStorage> {
    let storage = SqliteStorage::new(path)?;
    Ok(Arc::new(Mutex::new(storage)))
}

/// Locks shared storage, mapping a poisoned lock to a storage error
pub fn lock(storage: &SharedStorage) -> StorageResult<MutexGuard<'_, dyn Storage + Send + 'static>> {
    storage.lock().map_err(|_| StorageError::LockPoisoned)
}

/// Runs `f` inside a single transaction, rolling back if it fails
pub fn with_transaction<S, T, E, F>(storage: &mut S, f: F) -> Result<T, E>
where
    S: Storage + ?Sized,
    F: FnOnce(&mut S) -> Result<T, E>,
    E: From<StorageError>,
{
    storage.begin()?;
    match f(storage) {
        Ok(value) => {
            storage.commit()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = storage.rollback() {
                tracing::error!("Rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

/// A crawl run as stored in `crawling`
#[derive(Debug, Clone, Serialize)]
pub struct CrawlJob {
    pub id: i64,
    pub start_urls: String,
    pub keyword: String,
    pub total_page: u64,
    pub duration_crawl: String,
    pub started_at: String,
}

/// A page row as stored in `page_information`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: i64,
    pub url: String,
    pub crawl_id: i64,
    pub html5: bool,
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub content_article: Option<String>,
    pub content_text: String,
    pub hot_url: bool,
    pub size_bytes: u64,
    pub model_crawl: String,
    pub duration_crawl: String,
}

/// Everything needed to insert a page row
#[derive(Debug, Clone, Deserialize)]
pub struct NewPage {
    pub url: String,
    pub crawl_id: i64,
    pub html5: bool,
    pub title: String,
    pub description: String,
    pub keywords: String,
    #[serde(default)]
    pub content_article: Option<String>,
    pub content_text: String,
    #[serde(default)]
    pub hot_url: bool,
    pub size_bytes: u64,
    pub model_crawl: String,
    /// Elapsed seconds spent on the page
    #[serde(default)]
    pub duration_crawl: f64,
}

/// Auxiliary per-page payload tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Form,
    Image,
    List,
    Script,
    Style,
    Table,
}

impl PayloadKind {
    pub const ALL: [PayloadKind; 6] = [
        Self::Form,
        Self::Image,
        Self::List,
        Self::Script,
        Self::Style,
        Self::Table,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            Self::Form => "page_forms",
            Self::Image => "page_images",
            Self::List => "page_list",
            Self::Script => "page_scripts",
            Self::Style => "page_styles",
            Self::Table => "page_tables",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::Form => "form",
            Self::Image => "image",
            Self::List => "list",
            Self::Script => "script",
            Self::Style => "style",
            Self::Table => "table_str",
        }
    }
}

/// Formats a duration as a `HH:MM:SS.mmm` time span
pub fn format_time_span(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

/// Parses a `HH:MM:SS[.mmm]` time span back into a duration
pub fn parse_time_span(span: &str) -> Option<Duration> {
    let mut parts = span.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || !(0.0..60.0).contains(&seconds) {
        return None;
    }
    Some(Duration::from_secs(hours * 3600 + minutes * 60) + Duration::from_secs_f64(seconds))
}
