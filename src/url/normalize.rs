use crate::url::is_valid_parsed;
use crate::{UrlError, UrlResult};
use url::Url;

/// Resolves an anchor href against the page it was found on
///
/// Relative references are joined onto `base` and trailing slashes are stripped, so
/// `/foo/` on `http://x.com/bar` becomes `http://x.com/foo`. The result is not checked
/// for crawlability: every resolvable link belongs in the link graph.
///
/// Returns `None` only when the href cannot be resolved at all.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use ladang_crawler::url::resolve_link;
///
/// let base = Url::parse("http://x.com/bar").unwrap();
/// assert_eq!(resolve_link(&base, "/foo/"), Some("http://x.com/foo".to_string()));
/// ```
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let joined = base.join(href.trim()).ok()?;
    Some(strip_trailing_slash(joined.as_str()).to_string())
}

/// Strips every trailing `/` from a URL string
pub fn strip_trailing_slash(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Parses a URL and rejects anything the crawler cannot fetch
pub fn parse_crawlable(url: &str) -> UrlResult<Url> {
    let parsed = Url::parse(url).map_err(|e| UrlError::Parse(e.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(UrlError::InvalidScheme(parsed.scheme().to_string()));
    }
    if !is_valid_parsed(&parsed) {
        return Err(UrlError::MissingHost);
    }

    Ok(parsed)
}
