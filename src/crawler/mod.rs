//! Crawler module: the crawl engine proper
//!
//! This module contains the core crawling logic, including:
//! - Side requests (robots.txt, sitemaps, PDF downloads) and seed credentials
//! - HTML parsing and link discovery, static and click-based
//! - The per-page navigation state machine
//! - Pool admission, autoscaling and abort conditions
//! - The three crawl strategies and overall run coordination

mod auth;
mod coordinator;
mod fetcher;
mod links;
mod navigator;
mod parser;
mod scheduler;
mod strategy;

#[cfg(test)]
mod testing;

pub use auth::{strip_credentials, BasicAuth};
pub use coordinator::{run_crawl, Collaborators, CrawlContext, CrawlReport, Crawler};
pub use fetcher::{build_http_client, classify_error, content_type_of, Fetcher, TextResponse};
pub use links::{discover_links, offer_link, LinkOutcome, CLICKABLE_SELECTORS};
pub use navigator::process_request;
pub use parser::{clickable_elements, extract_title_from, parse_html, resolve_link, ParsedPage};
pub use scheduler::{AbortController, AbortReason, ConcurrencyController};
pub use strategy::{crawl_domain, crawl_intelligent, crawl_sitemap};
