use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::url::ScopeStrategy;

/// Main configuration structure for Sumi-Sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub browser: EngineConfig,
    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Which entry point drives the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum CrawlMode {
    /// Follow links from the seed
    #[serde(rename = "website")]
    #[default]
    Website,

    /// Visit only what the sitemap lists
    #[serde(rename = "sitemap")]
    Sitemap,

    /// Ranked sitemap pass, then link following for the remaining budget
    #[serde(rename = "intelligent")]
    Intelligent,
}

/// What to crawl and when to stop
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Starting URL; may carry `user:pass@` credentials
    pub seed: String,

    #[serde(default)]
    pub mode: CrawlMode,

    #[serde(default)]
    pub strategy: ScopeStrategy,

    /// Sitemap URL or local file path; discovered from the seed when absent
    #[serde(default)]
    pub sitemap: Option<String>,

    #[serde(rename = "max-requests-per-crawl", default = "default_max_requests")]
    pub max_requests_per_crawl: usize,

    /// Wall-clock budget for the whole run
    #[serde(rename = "scan-duration-secs", default)]
    pub scan_duration_secs: Option<u64>,

    #[serde(rename = "include-pdfs", default)]
    pub include_pdfs: bool,

    /// Skip click-based link discovery
    #[serde(rename = "safe-mode", default)]
    pub safe_mode: bool,

    #[serde(rename = "follow-robots", default = "default_true")]
    pub follow_robots: bool,

    /// URL globs or domain patterns that must never be scanned
    #[serde(default)]
    pub blacklist: Vec<String>,
}

impl CrawlConfig {
    pub fn scan_duration(&self) -> Option<Duration> {
        self.scan_duration_secs.map(Duration::from_secs)
    }
}

/// Worker pool sizing and page timing
#[derive(Debug, Clone, Deserialize)]
pub struct ConcurrencyConfig {
    #[serde(rename = "min-concurrency", default = "default_min_concurrency")]
    pub min_concurrency: usize,

    #[serde(rename = "max-concurrency", default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(rename = "navigation-timeout-ms", default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,

    /// How long the DOM must stay unchanged to count as settled
    #[serde(rename = "dom-quiet-period-ms", default = "default_quiet_period")]
    pub dom_quiet_period_ms: u64,

    /// Upper bound on the DOM stability wait
    #[serde(rename = "dom-stability-ceiling-ms", default = "default_stability_ceiling")]
    pub dom_stability_ceiling_ms: u64,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            min_concurrency: default_min_concurrency(),
            max_concurrency: default_max_concurrency(),
            navigation_timeout_ms: default_navigation_timeout(),
            dom_quiet_period_ms: default_quiet_period(),
            dom_stability_ceiling_ms: default_stability_ceiling(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite dataset
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Where downloaded PDFs are written before handoff
    #[serde(rename = "download-dir", default = "default_download_dir")]
    pub download_dir: String,
}

/// Page engine selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum EngineKind {
    #[serde(rename = "http")]
    #[default]
    Http,

    #[serde(rename = "chromium")]
    Chromium,
}

/// Browser launch settings
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineKind,

    /// Parent of the per-worker profile directories
    #[serde(rename = "profile-dir", default = "default_profile_dir")]
    pub profile_dir: String,

    #[serde(default = "default_true")]
    pub headless: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            profile_dir: default_profile_dir(),
            headless: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_requests() -> usize {
    100
}

fn default_min_concurrency() -> usize {
    1
}

fn default_max_concurrency() -> usize {
    5
}

fn default_navigation_timeout() -> u64 {
    30_000
}

fn default_quiet_period() -> u64 {
    500
}

fn default_stability_ceiling() -> u64 {
    5_000
}

fn default_download_dir() -> String {
    "./downloads".to_string()
}

fn default_profile_dir() -> String {
    "./profiles".to_string()
}
