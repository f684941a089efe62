//! Sumi-Sweep: a scoped site crawler that feeds pages to a scanner
//!
//! This crate implements the crawl engine behind a page-scanning run: it walks a
//! site (or its sitemaps) under a scope policy, visits every in-scope page at most
//! once, sorts each visit into an outcome bucket, and hands loaded HTML pages to
//! an external [`scanner::Scanner`].

pub mod browser;
pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod scanner;
pub mod sitemap;
pub mod state;
pub mod storage;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Sumi-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Too many redirects from {url}")]
    RedirectLimit { url: String },

    #[error("Redirect loop detected at {url}")]
    RedirectLoop { url: String },

    #[error("Navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("Scanner failed for {url}: {source}")]
    Scan {
        url: String,
        source: scanner::ScanError,
    },

    #[error("Sitemap {url} unusable: {message}")]
    Sitemap { url: String, message: String },

    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Cannot create profile directory {path}: {source}")]
    ProfileDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SweepError {
    /// Returns true for errors that end the whole run rather than a single page
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SweepError::Launch(_)
                | SweepError::ProfileDir { .. }
                | SweepError::Database(_)
                | SweepError::StorageError(_)
                | SweepError::Config(_)
        )
    }

    /// Best-effort HTTP status carried by the error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SweepError::Http { source, .. } | SweepError::Reqwest(source) => {
                source.status().map(|s| s.as_u16())
            }
            _ => None,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid blacklist pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Sumi-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::run_crawl;
pub use state::{Bucket, CrawlResults, CrawlState, PageInfo, Request};
pub use url::{dedup_key, in_scope, ScopeStrategy};
