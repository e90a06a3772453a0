//! Ladang crawler main entry point
//!
//! This is the command-line interface for the Ladang focused crawler.

use anyhow::Context;
use clap::Parser;
use ladang_crawler::config::{load_config_with_hash, validate, Config};
use ladang_crawler::crawler::Coordinator;
use ladang_crawler::service;
use ladang_crawler::storage::{open_storage, SharedStorage};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Ladang: a focused web crawler
///
/// Ladang crawls whitelisted sites from seed URLs within a time budget and stores
/// page content, metadata, tags and the outgoing link graph for ranking jobs.
#[derive(Parser, Debug)]
#[command(name = "ladang-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A focused web crawler", long_about = None)]
struct Cli {
    /// Crawl profile (TOML)
    #[arg(value_name = "PROFILE")]
    config: PathBuf,

    /// More log output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log errors only
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Seed URL, replacing the configured seeds (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Keyword label for the crawl job
    #[arg(long)]
    keyword: Option<String>,

    /// Time budget in seconds
    #[arg(long, value_name = "SECS")]
    duration: Option<u64>,

    /// Number of scrape workers
    #[arg(long)]
    workers: Option<u32>,

    /// Validate the profile and print it without crawling
    #[arg(long, conflicts_with_all = ["list", "pages", "import"])]
    dry_run: bool,

    /// Print stored pages as JSON and exit
    #[arg(long, conflicts_with_all = ["dry_run", "pages", "import"])]
    list: bool,

    /// First row for --list (requires --length)
    #[arg(long, requires = "length")]
    start: Option<u64>,

    /// Row count for --list (requires --start)
    #[arg(long, requires = "start")]
    length: Option<u64>,

    /// Print the pages with these ids as JSON and exit
    #[arg(long, value_delimiter = ',', value_name = "IDS", conflicts_with_all = ["dry_run", "list", "import"])]
    pages: Option<Vec<i64>>,

    /// Import page bundles from a JSON file and exit
    #[arg(long, value_name = "FILE", conflicts_with_all = ["dry_run", "list", "pages"])]
    import: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading profile {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Profile hash {}", hash);

    apply_overrides(&mut config, &cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let storage = open_storage(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open database {}", config.output.database_path))?;

    if cli.list {
        handle_list(&storage, cli.start, cli.length)?;
    } else if let Some(ids) = &cli.pages {
        handle_pages(&storage, ids)?;
    } else if let Some(path) = &cli.import {
        handle_import(&storage, path)?;
    } else {
        handle_crawl(config, storage).await?;
    }

    Ok(())
}

/// Installs the tracing subscriber; `RUST_LOG` wins over the verbosity flags
fn setup_logging(verbose: u8, quiet: bool) {
    let directives = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "ladang_crawler=info,warn",
        (false, 1) => "ladang_crawler=debug,info",
        (false, 2) => "ladang_crawler=trace,debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose >= 2)
        .init();
}

/// Applies command-line overrides and re-validates
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if !cli.seeds.is_empty() {
        config.crawl.seeds = cli.seeds.clone();
    }
    if let Some(keyword) = &cli.keyword {
        config.crawl.keyword = keyword.clone();
    }
    if let Some(duration) = cli.duration {
        config.crawler.duration_secs = duration;
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }

    validate(config).context("Invalid command-line override")?;
    Ok(())
}

/// Prints the effective profile without touching the network or the database
fn handle_dry_run(config: &Config) {
    let crawler = &config.crawler;
    let profile = &config.profile;

    println!("ladang-crawler dry run");
    println!();
    println!(
        "crawl      {} for '{}', {} workers, {}s budget",
        crawler.strategy.label(),
        config.crawl.keyword,
        crawler.workers,
        crawler.duration_secs
    );
    println!(
        "timeouts   idle {}s, request {}s, wait for in-flight: {}",
        crawler.idle_timeout_secs, crawler.request_timeout_secs, crawler.wait_for_in_flight
    );
    println!(
        "agent      {}/{}",
        config.user_agent.crawler_name, config.user_agent.crawler_version
    );
    println!("database   {}", config.output.database_path);
    println!(
        "article    {} (body: {})",
        profile.article_container,
        profile.article_body.as_deref().unwrap_or("none")
    );
    if let Some(container) = &profile.tag_container {
        println!("tags       {} {}", container, profile.tag_item);
    }
    println!("whitelist  {}", config.crawl.whitelist.join(", "));
    for seed in &config.crawl.seeds {
        println!("seed       {}", seed);
    }
}

/// Handles the --list mode
fn handle_list(
    storage: &SharedStorage,
    start: Option<u64>,
    length: Option<u64>,
) -> anyhow::Result<()> {
    let pages = service::list_pages(storage, start, length)?;
    println!("{}", serde_json::to_string_pretty(&pages)?);
    Ok(())
}

/// Handles the --pages mode
fn handle_pages(storage: &SharedStorage, ids: &[i64]) -> anyhow::Result<()> {
    let pages = service::get_pages_by_ids(storage, ids)?;
    println!("{}", serde_json::to_string_pretty(&pages)?);
    Ok(())
}

/// Handles the --import mode
fn handle_import(storage: &SharedStorage, path: &Path) -> anyhow::Result<()> {
    let bundles = service::load_import_file(path)
        .with_context(|| format!("Failed to read import file {}", path.display()))?;

    let mut imported = 0;
    for bundle in &bundles {
        match service::add_page(storage, bundle)? {
            Some(page_id) => {
                tracing::debug!("Imported {} as page {}", bundle.page_information.url, page_id);
                imported += 1;
            }
            None => tracing::info!("Skipped existing page {}", bundle.page_information.url),
        }
    }

    println!("✓ Imported {} of {} pages", imported, bundles.len());
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, storage: SharedStorage) -> anyhow::Result<()> {
    tracing::info!(
        "Seeds: {}, whitelist: {}, keyword: '{}'",
        config.crawl.seeds.len(),
        config.crawl.whitelist.len(),
        config.crawl.keyword
    );

    let mut coordinator = Coordinator::new(config, storage)?;

    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping crawl");
            cancel.cancel();
        }
    });

    let report = coordinator.run().await.context("Crawl failed")?;

    println!(
        "✓ Crawl {} finished ({:?}): {} pages in {:.1}s",
        report.crawl_id,
        report.stop_reason,
        report.pages_persisted,
        report.elapsed.as_secs_f64()
    );

    Ok(())
}
