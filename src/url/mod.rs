//! URL handling module for Sumi-Sweep
//!
//! This module provides the dedup key, tracking-parameter stripping, host and
//! registrable-domain extraction, the crawl scope policy, and blacklist matching.

mod domain;
mod matcher;
mod normalize;
mod scope;

pub use domain::{extract_host, registrable_domain};
pub use matcher::{matches_wildcard, Blacklist};
pub use normalize::{dedup_key, parse_http_url, strip_tracking_params};
pub use scope::{in_scope, ScopeStrategy};

/// Returns true if the URL path ends in `.pdf`
pub fn is_pdf_url(url: &::url::Url) -> bool {
    url.path().to_ascii_lowercase().ends_with(".pdf")
}
