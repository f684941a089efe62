//! Format-specific entry extraction
//!
//! Parsing picks a handler from [`HANDLERS`] by the document's [`SitemapKind`].
//! Documents that are not well-formed XML, or whose kind has no handler, fall
//! back to scanning the raw text for `http(s)://` URLs.

use regex::Regex;
use roxmltree::{Document, Node, ParsingOptions};
use std::collections::HashSet;
use std::sync::OnceLock;

use super::classify::{classify, SitemapKind};

/// Child element names used to read one entry
#[derive(Debug, Clone, Copy)]
struct EntrySelectors {
    entry: &'static str,
    link: &'static str,
    date: &'static str,
    fallback_date: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
enum Handler {
    Index,
    Entries(EntrySelectors),
}

const HANDLERS: &[(SitemapKind, Handler)] = &[
    (
        SitemapKind::Xml,
        Handler::Entries(EntrySelectors {
            entry: "url",
            link: "loc",
            date: "lastmod",
            fallback_date: None,
        }),
    ),
    (SitemapKind::XmlIndex, Handler::Index),
    (
        SitemapKind::Rss,
        Handler::Entries(EntrySelectors {
            entry: "item",
            link: "link",
            date: "pubDate",
            fallback_date: None,
        }),
    ),
    (
        SitemapKind::Atom,
        Handler::Entries(EntrySelectors {
            entry: "entry",
            link: "link",
            date: "published",
            fallback_date: Some("updated"),
        }),
    ),
];

fn handler_for(kind: SitemapKind) -> Option<Handler> {
    HANDLERS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, handler)| *handler)
}

/// One page listed by a sitemap, before URL resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub location: String,
    pub last_modified: Option<String>,
}

/// What a sitemap document contained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapContent {
    /// `<loc>` values of a sitemap index, in document order
    Index(Vec<String>),
    /// Page entries of a urlset or feed
    Entries(Vec<RawEntry>),
    /// URLs found by scanning raw text
    NonStandard(Vec<String>),
}

/// Parses a sitemap document of any supported format
pub fn parse_sitemap(text: &str, max_links: usize) -> SitemapContent {
    let text = text.trim_start_matches('\u{feff}').trim();
    let options = ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };

    let document = match Document::parse_with_options(text, options) {
        Ok(document) => document,
        Err(_) => return SitemapContent::NonStandard(extract_urls(text, max_links)),
    };

    let kind = classify(document.root_element());
    match handler_for(kind) {
        Some(Handler::Index) => SitemapContent::Index(index_locations(document.root_element())),
        Some(Handler::Entries(selectors)) => {
            SitemapContent::Entries(entries(document.root_element(), selectors))
        }
        None => SitemapContent::NonStandard(extract_urls(text, max_links)),
    }
}

fn is_named(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.children()
        .find(|child| is_named(child, name))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn index_locations(root: Node<'_, '_>) -> Vec<String> {
    root.descendants()
        .filter(|node| is_named(node, "loc"))
        .filter_map(|node| node.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .collect()
}

fn entries(root: Node<'_, '_>, selectors: EntrySelectors) -> Vec<RawEntry> {
    root.descendants()
        .filter(|node| is_named(node, selectors.entry))
        .filter_map(|node| {
            let location = entry_link(node, selectors.link)?;
            let last_modified = child_text(node, selectors.date)
                .or_else(|| selectors.fallback_date.and_then(|name| child_text(node, name)));
            Some(RawEntry {
                location,
                last_modified,
            })
        })
        .collect()
}

/// Reads a link as element text (`<loc>`, RSS `<link>`) or as an Atom `href`
fn entry_link(entry: Node<'_, '_>, name: &str) -> Option<String> {
    if let Some(text) = child_text(entry, name) {
        return Some(text);
    }

    let mut links = entry.children().filter(|child| is_named(child, name));
    let preferred = links
        .clone()
        .find(|link| matches!(link.attribute("rel"), None | Some("alternate")));

    preferred
        .or_else(|| links.next())
        .and_then(|link| link.attribute("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
}

fn url_regex() -> &'static Regex {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE.get_or_init(|| {
        Regex::new(r#"https?://[^\s<>"'`\]\[)(]+"#).unwrap_or_else(|e| {
            unreachable!("URL pattern is a constant and compiles: {}", e)
        })
    })
}

/// Scans raw text for distinct `http(s)://` URLs, in order of appearance
pub fn extract_urls(text: &str, max_links: usize) -> Vec<String> {
    let mut seen = HashSet::new();

    url_regex()
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':']).to_string())
        .filter(|url| seen.insert(url.clone()))
        .take(max_links)
        .collect()
}
