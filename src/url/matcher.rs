use glob::{MatchOptions, Pattern};
use url::Url;

use crate::ConfigError;

/// Checks if a domain matches a wildcard pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches the bare domain and any subdomain
///
/// # Examples
///
/// ```
/// use sumi_sweep::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "example.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

#[derive(Debug, Clone)]
enum BlacklistRule {
    /// Glob over the full URL string
    Url(Pattern),
    /// Host pattern, optionally `*.`-prefixed
    Host(String),
}

/// User-supplied exclusion patterns
///
/// Entries that look like URL globs (containing `*`, `?` or `://`) are matched
/// against the whole URL; a `*` there may span `/`. Bare domains such as
/// `ads.example.com` or `*.tracker.net` match by host.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    rules: Vec<BlacklistRule>,
}

impl Blacklist {
    /// Compiles the configured patterns
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let mut rules = Vec::with_capacity(patterns.len());

        for raw in patterns {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }

            let is_host_pattern = !raw.contains("://")
                && !raw.contains('?')
                && !raw.contains('/')
                && (raw.starts_with("*.") || !raw.contains('*'));

            if is_host_pattern {
                rules.push(BlacklistRule::Host(raw.to_lowercase()));
            } else {
                let pattern = Pattern::new(raw)
                    .map_err(|e| ConfigError::InvalidPattern(format!("{}: {}", raw, e)))?;
                rules.push(BlacklistRule::Url(pattern));
            }
        }

        Ok(Self { rules })
    }

    /// Returns true if the URL matches any pattern
    pub fn is_blacklisted(&self, url: &Url) -> bool {
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        let host = url.host_str().map(|h| h.to_lowercase()).unwrap_or_default();

        self.rules.iter().any(|rule| match rule {
            BlacklistRule::Url(pattern) => pattern.matches_with(url.as_str(), options),
            BlacklistRule::Host(pattern) => matches_wildcard(pattern, &host),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
