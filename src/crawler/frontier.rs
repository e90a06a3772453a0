//! Crawl frontier: pending URLs plus the visited set
//!
//! All admission and claim decisions happen under one lock, so two pages discovering
//! the same new URL concurrently admit it exactly once, and a URL leaves the queue and
//! enters the visited set in the same step.

use crate::crawler::strategy::FrontierOrder;
use crate::url::{domain_token, parse_crawlable};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Result of waiting for work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// A URL, already marked visited
    Url(String),

    /// Nothing arrived within the idle timeout
    Idle,
}

struct FrontierState {
    order: Box<dyn FrontierOrder>,
    queued: HashSet<String>,
    visited: HashSet<String>,
}

/// Thread-safe URL queue with whitelist filtering on admission
pub struct Frontier {
    whitelist: HashSet<String>,
    state: Mutex<FrontierState>,
    notify: Notify,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// # Arguments
    ///
    /// * `whitelist` - Domain tokens eligible for crawling
    /// * `order` - Ordering used to pick the next URL
    pub fn new(whitelist: &[String], order: Box<dyn FrontierOrder>) -> Self {
        Self {
            whitelist: whitelist.iter().map(|w| w.trim().to_lowercase()).collect(),
            state: Mutex::new(FrontierState {
                order,
                queued: HashSet::new(),
                visited: HashSet::new(),
            }),
            notify: Notify::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, FrontierState> {
        // Every mutation leaves the sets consistent, so a poisoned lock is still usable
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads previously visited URLs and queues the seeds
    ///
    /// Seeds skip the whitelist but not the validity or visited checks, so a seed
    /// crawled by an earlier run is not fetched again.
    ///
    /// # Returns
    ///
    /// The number of seeds queued
    pub fn initialize<I>(&self, seeds: &[String], pre_visited: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut admitted = 0;
        {
            let mut state = self.state();
            state.visited.extend(pre_visited);

            for seed in seeds {
                if parse_crawlable(seed).is_err()
                    || state.visited.contains(seed)
                    || state.queued.contains(seed)
                {
                    tracing::debug!("Seed not queued: {}", seed);
                    continue;
                }
                state.queued.insert(seed.clone());
                state.order.push(seed.clone());
                admitted += 1;
            }
        }

        if admitted > 0 {
            self.notify.notify_one();
        }
        admitted
    }

    /// Returns true if the URL is crawlable and its domain token is whitelisted
    fn passes_filter(&self, url: &str) -> bool {
        let Ok(parsed) = parse_crawlable(url) else {
            return false;
        };
        domain_token(&parsed).is_some_and(|token| self.whitelist.contains(&token))
    }

    /// Checks admission without changing anything
    pub fn is_admissible(&self, url: &str) -> bool {
        if !self.passes_filter(url) {
            return false;
        }
        let state = self.state();
        !state.visited.contains(url) && !state.queued.contains(url)
    }

    /// Admits a discovered URL if it is valid, whitelisted and not yet seen
    ///
    /// # Returns
    ///
    /// * `true` - The URL was queued by this call
    /// * `false` - It was filtered out or is already queued or visited
    pub fn try_enqueue(&self, url: &str) -> bool {
        if !self.passes_filter(url) {
            return false;
        }

        {
            let mut state = self.state();
            if state.visited.contains(url) || !state.queued.insert(url.to_string()) {
                return false;
            }
            state.order.push(url.to_string());
        }

        self.notify.notify_one();
        true
    }

    fn pop_and_claim(&self) -> Option<String> {
        let mut state = self.state();
        let url = state.order.pop()?;
        state.queued.remove(&url);
        state.visited.insert(url.clone());
        Some(url)
    }

    /// Waits up to `idle_timeout` for a URL and marks it visited
    pub async fn claim_next(&self, idle_timeout: Duration) -> Claim {
        let deadline = Instant::now() + idle_timeout;

        loop {
            if let Some(url) = self.pop_and_claim() {
                return Claim::Url(url);
            }

            // notify_one stores a permit when nobody waits, so a push between the pop
            // above and this wait is not lost
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return match self.pop_and_claim() {
                    Some(url) => Claim::Url(url),
                    None => Claim::Idle,
                };
            }
        }
    }

    /// Number of URLs waiting to be claimed
    pub fn len(&self) -> usize {
        self.state().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn visited_count(&self) -> usize {
        self.state().visited.len()
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.state().visited.contains(url)
    }
}
