//! Per-URL scrape pipeline
//!
//! One execution fetches a claimed URL, extracts it, persists the page with its links,
//! tags and payloads in a single transaction, then offers the discovered links to the
//! frontier.

use crate::config::{CrawlProfile, CrawlStrategy};
use crate::crawler::extractor::{extract_page, ExtractedPage};
use crate::crawler::fetcher::{fetch_page, FetchResult};
use crate::crawler::frontier::Frontier;
use crate::storage::{self, with_transaction, NewPage, SharedStorage};
use crate::LadangError;
use chrono::Local;
use reqwest::Client;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// How a single scrape ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page was stored
    Persisted {
        page_id: i64,
        /// Outgoing links recorded for the page
        links: usize,
        /// Links newly admitted to the frontier
        admitted: usize,
    },

    /// The URL was already stored; nothing was written
    Duplicate,

    /// Network failure or non-200 response
    FetchFailed,

    /// The crawl was cancelled before the page was stored
    Cancelled,

    /// Any other failure; logged and contained
    Failed,
}

/// Everything one scrape needs, shared by every task of a run
pub struct ScrapePipeline {
    client: Client,
    storage: SharedStorage,
    frontier: Arc<Frontier>,
    profile: CrawlProfile,
    crawl_id: i64,
    strategy: CrawlStrategy,
    cancel: CancellationToken,
}

impl ScrapePipeline {
    pub fn new(
        client: Client,
        storage: SharedStorage,
        frontier: Arc<Frontier>,
        profile: CrawlProfile,
        crawl_id: i64,
        strategy: CrawlStrategy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            storage,
            frontier,
            profile,
            crawl_id,
            strategy,
            cancel,
        }
    }

    /// Scrapes one URL, containing every failure
    ///
    /// This is the task boundary: errors are logged here and never reach the pool or
    /// the coordinator.
    pub async fn scrape(&self, url: &str) -> PageOutcome {
        match self.run(url).await {
            Ok(outcome) => {
                tracing::debug!("Scrape of {} ended: {:?}", url, outcome);
                outcome
            }
            Err(e) => {
                tracing::warn!("Scrape of {} failed: {}", url, e);
                PageOutcome::Failed
            }
        }
    }

    /// Scrapes one URL, returning unexpected failures to the caller
    pub async fn run(&self, url: &str) -> Result<PageOutcome, LadangError> {
        let started = Instant::now();

        let (final_url, body, size_bytes) = match fetch_page(&self.client, url, &self.cancel).await
        {
            FetchResult::Success {
                final_url,
                body,
                size_bytes,
            } => (final_url, body, size_bytes),
            FetchResult::HttpError { status_code } => {
                tracing::warn!("Fetch of {} returned HTTP {}", url, status_code);
                return Ok(PageOutcome::FetchFailed);
            }
            FetchResult::NetworkError { error } => {
                tracing::warn!("Fetch of {} failed: {}", url, error);
                return Ok(PageOutcome::FetchFailed);
            }
            FetchResult::Cancelled => return Ok(PageOutcome::Cancelled),
        };

        tracing::info!(
            url = %url,
            strategy = self.strategy.short_name(),
            at = %Local::now().format("%d/%m/%Y %H:%M:%S"),
            "Scraping page"
        );

        // Links resolve against where the page ended up, not where it was requested
        let base = Url::parse(&final_url)?;
        let page = extract_page(&body, &base, &self.profile).map_err(|source| {
            LadangError::Extract {
                url: url.to_string(),
                source,
            }
        })?;

        if self.cancel.is_cancelled() {
            return Ok(PageOutcome::Cancelled);
        }

        let exists = storage::lock(&self.storage)?.record_exists("page_information", "url", url)?;
        if exists {
            return Ok(PageOutcome::Duplicate);
        }

        if self.cancel.is_cancelled() {
            return Ok(PageOutcome::Cancelled);
        }

        let Some(page_id) = self.persist(url, &page, size_bytes, started)? else {
            return Ok(PageOutcome::Duplicate);
        };

        let admitted = page
            .links
            .iter()
            .filter(|link| self.frontier.try_enqueue(link))
            .count();

        tracing::debug!(
            "Stored {} as page {} ({} links, {} admitted)",
            url,
            page_id,
            page.links.len(),
            admitted
        );

        Ok(PageOutcome::Persisted {
            page_id,
            links: page.links.len(),
            admitted,
        })
    }

    /// Writes the page and everything hanging off it in one transaction
    ///
    /// Returns `None` when another task stored the URL first.
    fn persist(
        &self,
        url: &str,
        page: &ExtractedPage,
        size_bytes: u64,
        started: Instant,
    ) -> Result<Option<i64>, LadangError> {
        let record = NewPage {
            url: url.to_string(),
            crawl_id: self.crawl_id,
            html5: page.html5,
            title: page.title.clone(),
            description: page.description.clone(),
            keywords: page.keywords.clone(),
            content_article: page.content_article.clone(),
            content_text: page.content_text.clone(),
            hot_url: false,
            size_bytes,
            model_crawl: self.strategy.label().to_string(),
            duration_crawl: 0.0,
        };

        let mut storage = storage::lock(&self.storage)?;
        with_transaction(&mut *storage, |tx| -> Result<Option<i64>, LadangError> {
            let Some(page_id) = tx.insert_page(&record)? else {
                return Ok(None);
            };

            for link in &page.links {
                tx.insert_link(page_id, link)?;
            }
            for tag in &page.tags {
                tx.insert_tag(page_id, tag)?;
            }
            for (kind, payload) in &page.payloads {
                tx.insert_payload(page_id, *kind, payload)?;
            }

            tx.update_page_duration(page_id, started.elapsed())?;
            Ok(Some(page_id))
        })
    }
}
