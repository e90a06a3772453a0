//! Content extraction from fetched HTML
//!
//! This module parses a page once and derives everything that gets persisted:
//! - Title, meta description and meta keywords
//! - Canonical body text (article container path or whole-body fallback)
//! - The site-specific article body block
//! - Outgoing links, tags and optional auxiliary payloads

use crate::config::CrawlProfile;
use crate::storage::PayloadKind;
use crate::url::resolve_link;
use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;
use url::Url;

/// Sentinel stored when a meta field is absent
pub const MISSING_META: &str = "-";

/// Tags whose direct text children are never part of the page text
const NON_CONTENT_TAGS: &[&str] = &["style", "script", "head", "title", "meta"];

/// Failures that make a page unusable
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("page has no title")]
    MissingTitle,

    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Everything extracted from one page
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    /// True when the article container was present and scoped the text
    pub html5: bool,
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub content_article: Option<String>,
    /// Canonical comma-delimited text
    pub content_text: String,
    /// Every resolvable `a[href]`, in document order
    pub links: Vec<String>,
    pub tags: Vec<String>,
    pub payloads: Vec<(PayloadKind, String)>,
}

fn selector(raw: &str) -> Result<Selector, ExtractError> {
    Selector::parse(raw).map_err(|e| ExtractError::InvalidSelector {
        selector: raw.to_string(),
        reason: format!("{:?}", e),
    })
}

/// Extracts a page according to a crawl profile
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The page's own URL, used to resolve relative links
/// * `profile` - Site-specific selectors and enabled extractions
///
/// # Returns
///
/// * `Ok(ExtractedPage)` - The page was usable
/// * `Err(ExtractError)` - A required element (the title) is absent
///
/// # Example
///
/// ```
/// use ladang_crawler::config::CrawlProfile;
/// use ladang_crawler::crawler::extract_page;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><p>a, b</p><a href="/x/">x</a></body></html>"#;
/// let base = Url::parse("http://x.com/bar").unwrap();
/// let page = extract_page(html, &base, &CrawlProfile::default()).unwrap();
/// assert_eq!(page.title, "Test");
/// assert_eq!(page.content_text, "a,b x,");
/// assert_eq!(page.links, vec!["http://x.com/x".to_string()]);
/// ```
pub fn extract_page(
    html: &str,
    base_url: &Url,
    profile: &CrawlProfile,
) -> Result<ExtractedPage, ExtractError> {
    let document = Html::parse_document(html);

    let title = extract_title(&document)?;

    let container = selector(&profile.article_container)?;
    let (html5, text_root) = match document.select(&container).next() {
        Some(article) => (true, article),
        None => (false, body_or_root(&document)?),
    };
    let content_text = canonicalize_text(&visible_text(text_root));

    let content_article = match &profile.article_body {
        Some(raw) => {
            let body = selector(raw)?;
            document
                .select(&body)
                .next()
                .map(|el| el.text().collect::<String>())
        }
        None => None,
    };

    let tags = match &profile.tag_container {
        Some(raw) => extract_tags(&document, &selector(raw)?, &selector(&profile.tag_item)?),
        None => Vec::new(),
    };

    Ok(ExtractedPage {
        html5,
        title,
        description: meta_content(&document, "description")?,
        keywords: meta_content(&document, "keywords")?,
        content_article,
        content_text,
        links: extract_links(&document, base_url)?,
        tags,
        payloads: extract_payloads(&document, profile)?,
    })
}

fn extract_title(document: &Html) -> Result<String, ExtractError> {
    let title_selector = selector("title")?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(ExtractError::MissingTitle)
}

fn body_or_root(document: &Html) -> Result<ElementRef<'_>, ExtractError> {
    let body = selector("body")?;
    Ok(document
        .select(&body)
        .next()
        .unwrap_or_else(|| document.root_element()))
}

fn meta_content(document: &Html, name: &str) -> Result<String, ExtractError> {
    let meta = selector(&format!("meta[name=\"{}\"]", name))?;
    Ok(document
        .select(&meta)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string)
        .unwrap_or_else(|| MISSING_META.to_string()))
}

/// Joins the visible text fragments below `root`
///
/// A fragment is dropped when its parent is a non-content tag or the document node,
/// or when it starts with a newline (formatting whitespace between tags). Comments are
/// never text. Kept fragments are trimmed and joined with single spaces.
pub fn visible_text(root: ElementRef<'_>) -> String {
    let mut fragments = Vec::new();

    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let fragment: &str = text;

        let visible = match node.parent().map(|p| p.value()) {
            Some(Node::Element(parent)) => !NON_CONTENT_TAGS.contains(&parent.name()),
            _ => false,
        };
        if !visible || fragment.starts_with('\n') {
            continue;
        }

        fragments.push(fragment.trim());
    }

    fragments.join(" ").trim().to_string()
}

/// Canonicalizes joined page text into its comma-delimited stored form
///
/// The text is split on commas; every non-empty segment is trimmed and emitted
/// followed by a comma. Emptiness is judged before trimming, so a whitespace-only
/// segment still yields an empty entry.
///
/// # Example
///
/// ```
/// use ladang_crawler::crawler::canonicalize_text;
///
/// assert_eq!(canonicalize_text("a, b,, c"), "a,b,c,");
/// ```
pub fn canonicalize_text(raw: &str) -> String {
    raw.trim()
        .split(',')
        .filter(|segment| !segment.is_empty())
        .map(|segment| format!("{},", segment.trim()))
        .collect()
}

fn extract_links(document: &Html, base_url: &Url) -> Result<Vec<String>, ExtractError> {
    let anchors = selector("a[href]")?;
    Ok(document
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| resolve_link(base_url, href))
        .collect())
}

fn extract_tags(document: &Html, container: &Selector, item: &Selector) -> Vec<String> {
    let Some(container) = document.select(container).next() else {
        return Vec::new();
    };

    container
        .select(item)
        .map(|tag| {
            tag.text()
                .collect::<String>()
                .replace(&['\t', '\n'][..], "")
                .to_lowercase()
        })
        .filter(|tag| !tag.is_empty())
        .collect()
}

fn payload_selector(kind: PayloadKind) -> &'static str {
    match kind {
        PayloadKind::Form => "form",
        PayloadKind::Image => "img",
        PayloadKind::List => "li",
        PayloadKind::Script => "script",
        PayloadKind::Style => "style",
        PayloadKind::Table => "table",
    }
}

fn payload_enabled(profile: &CrawlProfile, kind: PayloadKind) -> bool {
    match kind {
        PayloadKind::Form => profile.extract_forms,
        PayloadKind::Image => profile.extract_images,
        PayloadKind::List => profile.extract_lists,
        PayloadKind::Script => profile.extract_scripts,
        PayloadKind::Style => profile.extract_styles,
        PayloadKind::Table => profile.extract_tables,
    }
}

fn extract_payloads(
    document: &Html,
    profile: &CrawlProfile,
) -> Result<Vec<(PayloadKind, String)>, ExtractError> {
    let mut payloads = Vec::new();

    for kind in PayloadKind::ALL {
        if !payload_enabled(profile, kind) {
            continue;
        }
        let sel = selector(payload_selector(kind))?;
        payloads.extend(document.select(&sel).map(|el| (kind, el.html())));
    }

    Ok(payloads)
}
