//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the run loop that coordinates a crawl:
//! - Creating the crawl job and seeding the frontier
//! - Claiming URLs and dispatching scrape tasks to the worker pool
//! - Enforcing the time budget and detecting an exhausted frontier
//! - Draining the pool and recording final totals

use crate::config::Config;
use crate::crawler::fetcher::build_http_client;
use crate::crawler::frontier::{Claim, Frontier};
use crate::crawler::pipeline::ScrapePipeline;
use crate::crawler::pool::{ShutdownPolicy, WorkerPool};
use crate::crawler::strategy::order_for;
use crate::storage::{self, SharedStorage};
use crate::LadangError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    /// Not started yet
    Idle,
    /// Claiming and dispatching
    Running,
    /// No new dispatch; the pool is being shut down
    Draining,
    Stopped,
}

/// Why the run loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The wall-clock budget ran out
    BudgetExpired,
    /// The frontier stayed empty with no scrape outstanding
    FrontierExhausted,
    /// The cancellation token fired from outside (e.g. Ctrl-C)
    Interrupted,
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub crawl_id: i64,
    /// Pages stored under this crawl id
    pub pages_persisted: u64,
    pub elapsed: Duration,
    pub stop_reason: StopReason,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    storage: SharedStorage,
    frontier: Arc<Frontier>,
    pipeline: Arc<ScrapePipeline>,
    cancel: CancellationToken,
    crawl_id: i64,
    state: CrawlState,
}

impl Coordinator {
    /// Creates a coordinator and its crawl job
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `storage` - Shared storage the run writes into
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Crawl job created and frontier seeded
    /// * `Err(LadangError)` - Failed to initialize
    pub fn new(config: Config, storage: SharedStorage) -> Result<Self, LadangError> {
        let (crawl_id, visited) = {
            let mut guard = storage::lock(&storage)?;
            let crawl_id = guard.insert_crawl_job(
                &config.crawl.seeds,
                &config.crawl.keyword,
                0,
                config.crawler.duration(),
            )?;
            (crawl_id, guard.list_visited_urls()?)
        };

        tracing::info!(
            "Created crawl job {} ({} URLs already stored)",
            crawl_id,
            visited.len()
        );

        let frontier = Arc::new(Frontier::new(
            &config.crawl.whitelist,
            order_for(config.crawler.strategy, &config.crawl.keyword),
        ));
        let seeded = frontier.initialize(&config.crawl.seeds, visited);
        tracing::info!("Seeded frontier with {} URLs", seeded);

        let client = build_http_client(&config.user_agent, config.crawler.request_timeout())?;
        let cancel = CancellationToken::new();

        let pipeline = Arc::new(ScrapePipeline::new(
            client,
            Arc::clone(&storage),
            Arc::clone(&frontier),
            config.profile.clone(),
            crawl_id,
            config.crawler.strategy,
            cancel.clone(),
        ));

        Ok(Self {
            config,
            storage,
            frontier,
            pipeline,
            cancel,
            crawl_id,
            state: CrawlState::Idle,
        })
    }

    pub fn crawl_id(&self) -> i64 {
        self.crawl_id
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn frontier(&self) -> &Arc<Frontier> {
        &self.frontier
    }

    /// Token that stops the run when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the crawl until the budget expires or the frontier is exhausted
    pub async fn run(&mut self) -> Result<CrawlReport, LadangError> {
        tracing::info!(
            "Starting crawl run {} ({}, {} workers, budget {:?})",
            self.crawl_id,
            self.config.crawler.strategy.label(),
            self.config.crawler.workers,
            self.config.crawler.duration()
        );

        let started = Instant::now();
        let budget = self.config.crawler.duration();
        let idle_timeout = self.config.crawler.idle_timeout();
        let pool = WorkerPool::new(self.config.crawler.workers as usize, self.cancel.clone());
        let mut dispatched: u64 = 0;

        self.state = CrawlState::Running;

        let stop_reason = loop {
            let elapsed = started.elapsed();
            if elapsed >= budget {
                tracing::info!("Stopped because the time budget expired");
                break StopReason::BudgetExpired;
            }

            let wait = idle_timeout.min(budget - elapsed);
            let claim = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::info!("Stopped because the crawl was interrupted");
                    break StopReason::Interrupted;
                }
                claim = self.frontier.claim_next(wait) => claim,
            };

            match claim {
                Claim::Url(url) => match self.dispatch(&pool, url) {
                    Ok(()) => dispatched += 1,
                    Err(e) => tracing::error!("Dispatch failed: {}", e),
                },
                Claim::Idle => {
                    if started.elapsed() >= budget {
                        continue;
                    }
                    // Running scrapes may still discover links
                    if pool.outstanding() > 0 {
                        tracing::debug!(
                            "Frontier idle, {} scrapes outstanding",
                            pool.outstanding()
                        );
                        continue;
                    }
                    if self.frontier.is_empty() {
                        tracing::info!("Stopped because the frontier is empty");
                        break StopReason::FrontierExhausted;
                    }
                }
            }
        };

        self.state = CrawlState::Draining;
        self.drain(&pool).await;
        self.state = CrawlState::Stopped;

        let elapsed = started.elapsed();
        let pages_persisted = self.finish_job(elapsed)?;

        tracing::info!(
            "Crawl {} completed: {} dispatched, {} pages stored in {:?}",
            self.crawl_id,
            dispatched,
            pages_persisted,
            elapsed
        );

        Ok(CrawlReport {
            crawl_id: self.crawl_id,
            pages_persisted,
            elapsed,
            stop_reason,
        })
    }

    fn dispatch(&self, pool: &WorkerPool, url: String) -> Result<(), LadangError> {
        tracing::debug!("Dispatching {}", url);
        let pipeline = Arc::clone(&self.pipeline);
        pool.submit(async move {
            pipeline.scrape(&url).await;
        })?;
        Ok(())
    }

    /// Stops the pool according to the configured wait policy
    async fn drain(&self, pool: &WorkerPool) {
        if self.config.crawler.wait_for_in_flight {
            tracing::info!("Waiting for {} running scrapes", pool.active_count());
            pool.shutdown(ShutdownPolicy {
                cancel_pending: true,
                wait: true,
            })
            .await;
        } else {
            // In-flight scrapes abandon at their next cancellation checkpoint; joining
            // them keeps a late commit from landing after the final page count
            self.cancel.cancel();
            pool.shutdown(ShutdownPolicy {
                cancel_pending: true,
                wait: true,
            })
            .await;
        }
    }

    fn finish_job(&self, elapsed: Duration) -> Result<u64, LadangError> {
        let mut storage = storage::lock(&self.storage)?;
        let pages = storage.count_pages_for_crawl(self.crawl_id)?;
        storage.update_crawl_job(self.crawl_id, pages, elapsed)?;
        Ok(pages)
    }
}
