//! Sitemap discovery and resolution
//!
//! A sitemap source (a URL or a local file) is resolved into a bounded, ordered
//! list of [`Request`]s. Sitemap indexes are walked depth-first with an explicit
//! stack; every sitemap URL is fetched at most once per resolver, so indexes
//! that reference each other terminate. A branch that fails to fetch or parse
//! contributes nothing and never aborts the whole resolve.

pub mod classify;
pub mod extract;
pub mod rank;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use dashmap::DashSet;
use std::collections::HashSet;
use std::path::Path;
use url::Url;

use crate::crawler::Fetcher;
use crate::robots::RobotsCache;
use crate::state::Request;
use crate::url::{dedup_key, is_pdf_url};
use crate::{Result, SweepError};
use extract::{parse_sitemap, SitemapContent};

pub use classify::SitemapKind;

/// Upper bound on sitemap documents fetched by one resolve
const MAX_SITEMAPS: usize = 500;

/// Locations probed when robots.txt names no sitemap
const WELL_KNOWN_SITEMAPS: &[&str] = &["/sitemap.xml", "/sitemap_index.xml", "/sitemap/sitemap.xml"];

/// A page listed by a sitemap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    pub url: Url,
    pub last_modified: Option<DateTime<Utc>>,
}

impl SitemapEntry {
    pub fn new(url: Url, last_modified: Option<DateTime<Utc>>) -> Self {
        Self { url, last_modified }
    }
}

/// A sitemap still to be read
#[derive(Debug, Clone)]
enum Source {
    Remote(Url),
    Local(String),
}

impl Source {
    fn parse(source: &str) -> Self {
        match Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Source::Remote(url),
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(path) => Source::Local(path.to_string_lossy().into_owned()),
                Err(()) => Source::Local(source.to_string()),
            },
            _ => Source::Local(source.to_string()),
        }
    }

    fn key(&self) -> String {
        match self {
            Source::Remote(url) => url.to_string(),
            Source::Local(path) => format!("file:{}", path),
        }
    }

    fn base(&self) -> Option<&Url> {
        match self {
            Source::Remote(url) => Some(url),
            Source::Local(_) => None,
        }
    }
}

/// What one fetched sitemap source produced
enum Fetched {
    Document(String),
    Pdf(Url),
}

/// Walks sitemap documents and turns them into requests
#[derive(Debug)]
pub struct SitemapResolver {
    fetcher: Fetcher,
    visited: DashSet<String>,
}

impl SitemapResolver {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            visited: DashSet::new(),
        }
    }

    /// Resolves a sitemap source into at most `max_links` requests
    ///
    /// With `rank_against` set, all entries are collected and ordered by
    /// closeness to that URL before truncation; otherwise document order is
    /// kept and resolution stops as soon as `max_links` entries are known.
    pub async fn resolve(&self, source: &str, max_links: usize, rank_against: Option<&Url>) -> Vec<Request> {
        let mut entries: Vec<SitemapEntry> = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![Source::parse(source)];
        let mut fetched = 0usize;

        while let Some(current) = stack.pop() {
            if rank_against.is_none() && entries.len() >= max_links {
                break;
            }
            if !self.visited.insert(current.key()) {
                tracing::debug!("Sitemap {} already visited, skipping", current.key());
                continue;
            }
            if fetched >= MAX_SITEMAPS {
                tracing::warn!("Stopped after {} sitemap documents", MAX_SITEMAPS);
                break;
            }
            fetched += 1;

            let text = match self.load(&current).await {
                Ok(Fetched::Document(text)) => text,
                Ok(Fetched::Pdf(url)) => {
                    push_entry(&mut entries, &mut seen, SitemapEntry::new(url, None));
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Skipping sitemap {}: {}", current.key(), e);
                    continue;
                }
            };

            let base = current.base();
            match parse_sitemap(&text, max_links) {
                SitemapContent::Index(locations) => {
                    // Reversed so the stack pops children in document order
                    for location in locations.into_iter().rev() {
                        if is_nested_sitemap(&location) {
                            stack.push(child_source(&location, base));
                        } else if let Some(url) = resolve_location(&location, base) {
                            push_entry(&mut entries, &mut seen, SitemapEntry::new(url, None));
                        }
                    }
                }
                SitemapContent::Entries(raw) => {
                    tracing::debug!("Sitemap {} lists {} entries", current.key(), raw.len());
                    for entry in raw {
                        if let Some(url) = resolve_location(&entry.location, base) {
                            let last_modified = entry.last_modified.as_deref().and_then(parse_date);
                            push_entry(&mut entries, &mut seen, SitemapEntry::new(url, last_modified));
                        }
                    }
                }
                SitemapContent::NonStandard(urls) => {
                    tracing::debug!("Sitemap {} is non-standard, found {} URLs", current.key(), urls.len());
                    for location in urls {
                        if let Some(url) = resolve_location(&location, base) {
                            push_entry(&mut entries, &mut seen, SitemapEntry::new(url, None));
                        }
                    }
                }
            }
        }

        if let Some(seed) = rank_against {
            rank::rank(&mut entries, seed);
        }
        entries.truncate(max_links);

        entries
            .into_iter()
            .map(|entry| {
                let pdf = is_pdf_url(&entry.url);
                Request::new(entry.url).skip_navigation(pdf)
            })
            .collect()
    }

    async fn load(&self, source: &Source) -> Result<Fetched> {
        match source {
            Source::Local(path) => {
                if path.to_ascii_lowercase().ends_with(".pdf") {
                    let absolute = tokio::fs::canonicalize(path).await?;
                    return Url::from_file_path(&absolute)
                        .map(Fetched::Pdf)
                        .map_err(|()| SweepError::Sitemap {
                            url: path.clone(),
                            message: "not an absolute file path".to_string(),
                        });
                }
                let text = tokio::fs::read_to_string(Path::new(path)).await?;
                Ok(Fetched::Document(text))
            }
            Source::Remote(url) => {
                if is_pdf_url(url) {
                    return Ok(Fetched::Pdf(url.clone()));
                }

                let response = self.fetcher.get_text(url).await?;
                if !response.is_success() {
                    return Err(SweepError::Sitemap {
                        url: url.to_string(),
                        message: format!("status {}", response.status),
                    });
                }
                if response.content_type.as_deref() == Some("application/pdf") {
                    return Ok(Fetched::Pdf(response.final_url));
                }
                Ok(Fetched::Document(response.body))
            }
        }
    }

    /// Finds sitemap URLs for the seed's origin
    ///
    /// `Sitemap:` lines of robots.txt win; otherwise the first well-known
    /// location answering 2xx is used.
    pub async fn discover(&self, seed: &Url, robots: &RobotsCache) -> Vec<String> {
        let listed = robots.ensure_loaded(seed).await.policy.sitemaps().to_vec();
        if !listed.is_empty() {
            tracing::info!("robots.txt lists {} sitemap(s)", listed.len());
            return listed;
        }

        for candidate in WELL_KNOWN_SITEMAPS {
            let Ok(url) = seed.join(candidate) else {
                continue;
            };
            match self.fetcher.probe(&url).await {
                Ok(status) if (200..300).contains(&status) => {
                    tracing::info!("Found sitemap at {}", url);
                    return vec![url.to_string()];
                }
                Ok(status) => tracing::debug!("No sitemap at {} ({})", url, status),
                Err(e) => tracing::debug!("Sitemap probe {} failed: {}", url, e),
            }
        }

        tracing::info!("No sitemap found for {}", seed);
        Vec::new()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

fn push_entry(entries: &mut Vec<SitemapEntry>, seen: &mut HashSet<String>, entry: SitemapEntry) {
    if seen.insert(dedup_key(&entry.url)) {
        entries.push(entry);
    }
}

/// An index location pointing at another sitemap rather than a page
pub fn is_nested_sitemap(location: &str) -> bool {
    let path = location.split(['?', '#']).next().unwrap_or_default().to_ascii_lowercase();
    path.ends_with(".xml") || path.ends_with(".txt") || path.ends_with(".xml.gz")
}

fn child_source(location: &str, base: Option<&Url>) -> Source {
    match resolve_location(location, base) {
        Some(url) => Source::Remote(url),
        None => Source::parse(location),
    }
}

fn resolve_location(location: &str, base: Option<&Url>) -> Option<Url> {
    let parsed = match base {
        Some(base) => base.join(location.trim()),
        None => Url::parse(location.trim()),
    };

    match parsed {
        Ok(mut url) if matches!(url.scheme(), "http" | "https") => {
            url.set_fragment(None);
            Some(url)
        }
        _ => None,
    }
}

/// Parses sitemap, RSS and Atom date formats
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(raw) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
