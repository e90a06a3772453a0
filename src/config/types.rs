use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub profile: CrawlProfile,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent scrape workers
    pub workers: u32,

    /// Wall-clock budget for the whole run (seconds)
    #[serde(rename = "duration-secs")]
    pub duration_secs: u64,

    /// How long the coordinator waits on an empty frontier (seconds)
    #[serde(rename = "idle-timeout-secs", default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Per-request fetch timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Whether shutdown blocks until in-flight scrapes finish
    #[serde(rename = "wait-for-in-flight", default)]
    pub wait_for_in_flight: bool,

    /// Frontier ordering strategy
    #[serde(default)]
    pub strategy: CrawlStrategy,
}

impl CrawlerConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_idle_timeout() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    300
}

/// Frontier ordering strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStrategy {
    /// Breadth-first: claim URLs in discovery order
    #[default]
    Bfs,
    /// Keyword-priority: claim URLs mentioning the crawl keyword most often first
    Msb,
}

impl CrawlStrategy {
    /// Label stored in `page_information.model_crawl`
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bfs => "BFS crawling",
            Self::Msb => "MSB crawling",
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Bfs => "BFS",
            Self::Msb => "MSB",
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// What to crawl for this run
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// URLs the frontier starts from
    pub seeds: Vec<String>,

    /// Free-form label recorded on the crawl job
    #[serde(default)]
    pub keyword: String,

    /// Domain tokens eligible for crawling (e.g. "farmanddairy")
    pub whitelist: Vec<String>,
}

/// Per-site extraction profile
///
/// Selectors are CSS selectors understood by `scraper`. Optional selectors that are
/// absent simply disable the corresponding sub-extraction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlProfile {
    /// Container whose presence selects the html5 text path
    #[serde(default = "default_article_container")]
    pub article_container: String,

    /// Site-specific article body block
    #[serde(default)]
    pub article_body: Option<String>,

    /// Element holding the tag links
    #[serde(default)]
    pub tag_container: Option<String>,

    /// Tag items inside the tag container
    #[serde(default = "default_tag_item")]
    pub tag_item: String,

    #[serde(default)]
    pub extract_tables: bool,
    #[serde(default)]
    pub extract_lists: bool,
    #[serde(default)]
    pub extract_forms: bool,
    #[serde(default)]
    pub extract_images: bool,
    #[serde(default)]
    pub extract_scripts: bool,
    #[serde(default)]
    pub extract_styles: bool,
}

impl Default for CrawlProfile {
    fn default() -> Self {
        Self {
            article_container: default_article_container(),
            article_body: None,
            tag_container: None,
            tag_item: default_tag_item(),
            extract_tables: false,
            extract_lists: false,
            extract_forms: false,
            extract_images: false,
            extract_scripts: false,
            extract_styles: false,
        }
    }
}

fn default_article_container() -> String {
    "article".to_string()
}

fn default_tag_item() -> String {
    "a".to_string()
}
