//! Operations exposed to outer layers
//!
//! These are transport-independent: the command-line front-end calls them today and
//! an HTTP layer can call them unchanged.

use crate::config::{validate, Config};
use crate::crawler::{Coordinator, CrawlReport};
use crate::storage::{self, with_transaction, NewPage, PageRecord, PayloadKind, SharedStorage};
use crate::{LadangError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A crawl running in the background
pub struct CrawlHandle {
    crawl_id: i64,
    cancel: CancellationToken,
    task: JoinHandle<Result<CrawlReport>>,
}

impl CrawlHandle {
    pub fn crawl_id(&self) -> i64 {
        self.crawl_id
    }

    /// Asks the crawl to stop; in-flight pages finish or abandon per the drain policy
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the crawl to finish
    pub async fn join(self) -> Result<CrawlReport> {
        self.task.await?
    }
}

/// Starts a crawl in the background and returns as soon as its job exists
///
/// `seeds`, `keyword` and `duration` replace the corresponding configuration values;
/// everything else (workers, whitelist, profile) comes from `config`.
pub fn start_crawl(
    mut config: Config,
    seeds: Vec<String>,
    keyword: String,
    duration: Duration,
    storage: SharedStorage,
) -> Result<CrawlHandle> {
    config.crawl.seeds = seeds;
    config.crawl.keyword = keyword;
    config.crawler.duration_secs = duration.as_secs().max(1);
    validate(&config)?;

    let mut coordinator = Coordinator::new(config, storage)?;
    let crawl_id = coordinator.crawl_id();
    let cancel = coordinator.cancellation_token();
    let task = tokio::spawn(async move { coordinator.run().await });

    Ok(CrawlHandle {
        crawl_id,
        cancel,
        task,
    })
}

/// Lists stored pages; paging applies only when both bounds are given
pub fn list_pages(
    storage: &SharedStorage,
    start: Option<u64>,
    length: Option<u64>,
) -> Result<Vec<PageRecord>> {
    Ok(storage::lock(storage)?.list_pages(start, length)?)
}

/// Fetches stored pages by id
pub fn get_pages_by_ids(storage: &SharedStorage, ids: &[i64]) -> Result<Vec<PageRecord>> {
    Ok(storage::lock(storage)?.get_pages_by_ids(ids)?)
}

/// One child row of an imported page
///
/// The value key matches the column of the table the row belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleRow {
    #[serde(
        alias = "form",
        alias = "image",
        alias = "outgoing_link",
        alias = "list",
        alias = "script",
        alias = "style",
        alias = "table_str"
    )]
    pub value: String,
}

/// A page with all of its child rows, as produced by another crawler instance
#[derive(Debug, Clone, Deserialize)]
pub struct PageImport {
    pub page_information: NewPage,
    #[serde(default)]
    pub page_forms: Vec<BundleRow>,
    #[serde(default)]
    pub page_images: Vec<BundleRow>,
    #[serde(default)]
    pub page_linking: Vec<BundleRow>,
    #[serde(default)]
    pub page_list: Vec<BundleRow>,
    #[serde(default)]
    pub page_scripts: Vec<BundleRow>,
    #[serde(default)]
    pub page_styles: Vec<BundleRow>,
    #[serde(default)]
    pub page_tables: Vec<BundleRow>,
}

impl PageImport {
    /// Rejects values storage cannot represent
    fn check(&self) -> Result<()> {
        let page = &self.page_information;
        if Duration::try_from_secs_f64(page.duration_crawl).is_err() {
            return Err(LadangError::Import {
                url: page.url.clone(),
                reason: format!("duration_crawl {} is out of range", page.duration_crawl),
            });
        }
        Ok(())
    }

    fn payloads(&self) -> [(PayloadKind, &[BundleRow]); 6] {
        [
            (PayloadKind::Form, &self.page_forms),
            (PayloadKind::Image, &self.page_images),
            (PayloadKind::List, &self.page_list),
            (PayloadKind::Script, &self.page_scripts),
            (PayloadKind::Style, &self.page_styles),
            (PayloadKind::Table, &self.page_tables),
        ]
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportFile {
    Many(Vec<PageImport>),
    One(Box<PageImport>),
}

/// Parses an import document holding one bundle or an array of bundles
pub fn parse_import(json: &str) -> Result<Vec<PageImport>> {
    Ok(match serde_json::from_str::<ImportFile>(json)? {
        ImportFile::Many(pages) => pages,
        ImportFile::One(page) => vec![*page],
    })
}

/// Reads and parses an import file
pub fn load_import_file(path: &Path) -> Result<Vec<PageImport>> {
    let content = std::fs::read_to_string(path)?;
    parse_import(&content)
}

/// Stores an imported page with its child rows
///
/// # Returns
///
/// * `Ok(Some(id))` - The page was stored
/// * `Ok(None)` - A page with this URL already exists; nothing was written
pub fn add_page(storage: &SharedStorage, bundle: &PageImport) -> Result<Option<i64>> {
    bundle.check()?;
    let mut storage = storage::lock(storage)?;

    if storage.record_exists("page_information", "url", &bundle.page_information.url)? {
        tracing::debug!("Skipping import of {}", bundle.page_information.url);
        return Ok(None);
    }

    with_transaction(&mut *storage, |tx| -> std::result::Result<Option<i64>, LadangError> {
        let Some(page_id) = tx.insert_page(&bundle.page_information)? else {
            return Ok(None);
        };

        for link in &bundle.page_linking {
            tx.insert_link(page_id, &link.value)?;
        }
        for (kind, rows) in bundle.payloads() {
            for row in rows {
                tx.insert_payload(page_id, kind, &row.value)?;
            }
        }

        Ok(Some(page_id))
    })
}
