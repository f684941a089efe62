//! Per-origin robots.txt cache
//!
//! Each origin's robots.txt is fetched at most once per run and kept for the
//! run's lifetime. Two workers racing on a cold origin may both fetch it; the
//! first insert wins and both results are identical anyway.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use url::Url;

use crate::crawler::Fetcher;
use crate::robots::RobotsPolicy;

/// How a cached policy was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotsSource {
    /// robots.txt answered 2xx and was parsed
    Fetched,
    /// No usable robots.txt; nothing is disallowed
    Missing,
}

/// Cached robots.txt data for an origin
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub policy: RobotsPolicy,
    pub source: RobotsSource,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(policy: RobotsPolicy, source: RobotsSource) -> Self {
        Self {
            policy,
            source,
            fetched_at: Utc::now(),
        }
    }
}

/// Lazily populated robots policies keyed by origin
#[derive(Debug)]
pub struct RobotsCache {
    fetcher: Fetcher,
    entries: DashMap<String, Arc<CachedRobots>>,
}

impl RobotsCache {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            entries: DashMap::new(),
        }
    }

    /// Returns the policy for the URL's origin, fetching it on first use
    pub async fn ensure_loaded(&self, url: &Url) -> Arc<CachedRobots> {
        let origin = url.origin().ascii_serialization();
        if let Some(entry) = self.entries.get(&origin) {
            return Arc::clone(entry.value());
        }

        let fetched = Arc::new(self.fetch(&origin).await);
        let entry = self
            .entries
            .entry(origin)
            .or_insert_with(|| Arc::clone(&fetched));
        Arc::clone(entry.value())
    }

    async fn fetch(&self, origin: &str) -> CachedRobots {
        let robots_url = match Url::parse(origin).and_then(|o| o.join("/robots.txt")) {
            Ok(url) => url,
            Err(_) => return CachedRobots::new(RobotsPolicy::allow_all(), RobotsSource::Missing),
        };

        match self.fetcher.get_text(&robots_url).await {
            Ok(response) if response.is_success() => {
                tracing::debug!("Loaded robots.txt for {}", origin);
                CachedRobots::new(RobotsPolicy::parse(&response.body), RobotsSource::Fetched)
            }
            Ok(response) => {
                tracing::debug!(
                    "robots.txt for {} answered {}, allowing everything",
                    origin,
                    response.status
                );
                CachedRobots::new(RobotsPolicy::allow_all(), RobotsSource::Missing)
            }
            Err(e) => {
                tracing::warn!("Could not fetch robots.txt for {}: {}", origin, e);
                CachedRobots::new(RobotsPolicy::allow_all(), RobotsSource::Missing)
            }
        }
    }

    /// Checks a URL against an already loaded policy; unknown origins are allowed
    pub fn is_disallowed(&self, url: &Url) -> bool {
        self.entries
            .get(&url.origin().ascii_serialization())
            .map(|entry| entry.policy.is_disallowed(url.path()))
            .unwrap_or(false)
    }

    /// Loads the origin's policy if needed and checks the URL against it
    pub async fn check(&self, url: &Url) -> bool {
        self.ensure_loaded(url).await.policy.is_disallowed(url.path())
    }

    pub fn cached_origins(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserAgentConfig;
    use crate::crawler::build_http_client;
    use std::collections::HashMap;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> Fetcher {
        let config = UserAgentConfig {
            crawler_name: "TestSweep".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        };
        let client = build_http_client(&config, Duration::from_secs(5), true).unwrap();
        Fetcher::new(client, None, HashMap::new())
    }

    #[tokio::test]
    async fn test_fetches_once_per_origin() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("User-agent: *\nDisallow: /private/\nAllow: /private/public.html\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cache = RobotsCache::new(fetcher());
        let private = Url::parse(&format!("{}/private/x.html", server.uri())).unwrap();
        let public = Url::parse(&format!("{}/private/public.html", server.uri())).unwrap();

        assert!(cache.check(&private).await);
        assert!(!cache.check(&public).await);
        assert!(cache.is_disallowed(&private));
        assert_eq!(cache.cached_origins(), 1);
        assert_eq!(cache.ensure_loaded(&public).await.source, RobotsSource::Fetched);
    }

    #[tokio::test]
    async fn test_missing_robots_allows_everything() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let cache = RobotsCache::new(fetcher());
        let url = Url::parse(&format!("{}/anything", server.uri())).unwrap();

        assert!(!cache.check(&url).await);
        assert_eq!(cache.ensure_loaded(&url).await.source, RobotsSource::Missing);
    }

    #[tokio::test]
    async fn test_unreachable_origin_allows_everything() {
        let cache = RobotsCache::new(fetcher());
        // Nothing listens on port 9 of localhost
        let url = Url::parse("http://127.0.0.1:9/page").unwrap();
        assert!(!cache.check(&url).await);
    }

    #[test]
    fn test_unknown_origin_is_not_disallowed() {
        let cache = RobotsCache::new(fetcher());
        assert!(!cache.is_disallowed(&Url::parse("https://example.com/x").unwrap()));
    }
}
