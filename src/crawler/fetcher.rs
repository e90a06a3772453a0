//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and timeout
//! - GET requests to fetch page content
//! - Decoding the body with the charset the server declares
//! - Classifying failures (non-200 status, network errors)

use crate::config::UserAgentConfig;
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects; relative links resolve against it
        final_url: String,
        /// Page body, decoded
        body: String,
        /// Size of the raw response body in bytes
        size_bytes: u64,
    },

    /// The server answered with anything other than 200
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, etc.)
    NetworkError {
        /// Error description
        error: String,
    },

    /// The crawl was cancelled while the request was in flight
    Cancelled,
}

/// Builds an HTTP client with proper configuration
///
/// Certificate verification is disabled: target sites with broken TLS setups are
/// still crawled.
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use ladang_crawler::config::UserAgentConfig;
/// use ladang_crawler::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "LadangBot".to_string(),
///     crawler_version: "1.0".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(300)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", config.crawler_name, config.crawler_version);

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .danger_accept_invalid_certs(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL, giving up early if `cancel` fires
///
/// Only an exact 200 response counts as success. There is no retry: any failure
/// ends the attempt for this URL.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `cancel` - Crawl-wide cancellation signal
///
/// # Returns
///
/// A FetchResult indicating success or the type of failure
pub async fn fetch_page(client: &Client, url: &str, cancel: &CancellationToken) -> FetchResult {
    tokio::select! {
        _ = cancel.cancelled() => FetchResult::Cancelled,
        result = fetch(client, url) => result,
    }
}

async fn fetch(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return classify_error(e),
    };

    let status = response.status();
    if status != StatusCode::OK {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let final_url = response.url().to_string();
    let encoding = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(declared_encoding)
        .unwrap_or(UTF_8);

    match response.bytes().await {
        Ok(bytes) => {
            let (body, _, _) = encoding.decode(&bytes);
            FetchResult::Success {
                final_url,
                size_bytes: bytes.len() as u64,
                body: body.into_owned(),
            }
        }
        Err(e) => classify_error(e),
    }
}

/// Encoding named by the `charset` parameter of a Content-Type value
fn declared_encoding(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, label)| Encoding::for_label(label.trim().trim_matches('"').as_bytes()))
}

fn classify_error(e: reqwest::Error) -> FetchResult {
    let error = if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        "Connection refused".to_string()
    } else {
        e.to_string()
    };
    FetchResult::NetworkError { error }
}
