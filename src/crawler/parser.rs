//! HTML parser for extracting links and metadata
//!
//! This module handles the static side of link discovery:
//! - Anchors to follow (`<a href>` and the canonical link)
//! - Page title
//! - Elements that look clickable but carry no `href`

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Attributes that may hold a navigation target on non-anchor elements
const TARGET_ATTRIBUTES: &[&str] = &["data-href", "data-path", "data-url", "href"];

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// All followable links found on the page (absolute URLs)
    pub links: Vec<Url>,
}

/// Parses HTML content and extracts links and the title
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links, data URIs
/// - Fragment-only links
///
/// Relative links resolve against `<base href>` when the page declares one.
///
/// # Example
///
/// ```
/// use sumi_sweep::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].as_str(), "https://example.com/page");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);
    let base = document_base(&document, base_url);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, &base),
    }
}

/// Returns the `<title>` text of an HTML string
pub fn extract_title_from(html: &str) -> Option<String> {
    extract_title(&Html::parse_document(html))
}

/// Lists elements matching `selectors` that are not plain links
///
/// Each entry holds the navigation target readable straight off the element,
/// if any. Elements are returned in document order, once each, with their
/// position in the returned list as a stable index.
pub fn clickable_elements(html: &str, selectors: &[&str]) -> Vec<Option<String>> {
    let document = Html::parse_document(html);
    let mut seen = std::collections::HashSet::new();
    let mut found = Vec::new();

    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            tracing::debug!("Skipping invalid selector {}", raw);
            continue;
        };

        for element in document.select(&selector) {
            if is_plain_link(&element) || !seen.insert(element.id()) {
                continue;
            }
            found.push(static_target(&element));
        }
    }

    found
}

fn is_plain_link(element: &ElementRef<'_>) -> bool {
    element.value().name() == "a" && element.value().attr("href").is_some()
}

fn static_target(element: &ElementRef<'_>) -> Option<String> {
    TARGET_ATTRIBUTES
        .iter()
        .filter_map(|attr| element.value().attr(attr))
        .map(str::trim)
        .find(|value| !value.is_empty() && !is_non_navigational(value))
        .map(str::to_string)
}

fn document_base(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|el| el.value().attr("href"))
                .and_then(|href| page_url.join(href.trim()).ok())
        })
        .unwrap_or_else(|| page_url.clone())
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(absolute_url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(absolute_url);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(absolute_url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(absolute_url);
            }
        }
    }

    links
}

fn is_non_navigational(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
        || href.starts_with('#')
}

/// Resolves a link href to an absolute HTTP(S) URL
///
/// Returns None for empty, non-navigational, fragment-only or unparsable links.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || is_non_navigational(href) {
        return None;
    }

    match base_url.join(href) {
        Ok(mut absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            absolute_url.set_fragment(None);
            Some(absolute_url)
        }
        _ => None,
    }
}
