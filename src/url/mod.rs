//! URL handling module
//!
//! This module provides URL validity checks, link resolution, and the domain-token
//! derivation used by the frontier's whitelist filter.

mod domain;
mod normalize;

pub use domain::{domain_token, registrable_domain};
pub use normalize::{parse_crawlable, resolve_link, strip_trailing_slash};

use url::Url;

/// Returns true if the URL can be crawled at all: http(s) scheme and a non-empty host
///
/// # Examples
///
/// ```
/// use ladang_crawler::url::is_valid_url;
///
/// assert!(is_valid_url("https://example.com/page"));
/// assert!(!is_valid_url("mailto:someone@example.com"));
/// assert!(!is_valid_url("/relative/path"));
/// ```
pub fn is_valid_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => is_valid_parsed(&parsed),
        Err(_) => false,
    }
}

pub(crate) fn is_valid_parsed(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
}
