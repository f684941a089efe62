//! Closeness ranking for intelligent crawls
//!
//! A heuristic only: pages at or under the seed come first, newer pages before
//! older ones.

use url::Url;

use super::SitemapEntry;

/// Scores how close a candidate is to the seed
///
/// * 2: same host and same path
/// * 1: same host and the path sits under the seed's path
/// * 0: anything else
pub fn closeness(candidate: &Url, seed: &Url) -> u8 {
    if comparable_host(candidate) != comparable_host(seed) {
        return 0;
    }

    let candidate_path = candidate.path().trim_end_matches('/');
    let seed_path = seed.path().trim_end_matches('/');

    if candidate_path == seed_path {
        2
    } else if candidate_path.starts_with(&format!("{}/", seed_path)) {
        1
    } else {
        0
    }
}

fn comparable_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| {
        let h = h.to_lowercase();
        h.strip_prefix("www.").map(str::to_string).unwrap_or(h)
    })
}

/// Orders entries by closeness, then most recent modification first
///
/// The sort is stable, so equal entries keep document order.
pub fn rank(entries: &mut [SitemapEntry], seed: &Url) {
    entries.sort_by(|a, b| {
        closeness(&b.url, seed)
            .cmp(&closeness(&a.url, seed))
            .then_with(|| b.last_modified.cmp(&a.last_modified))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_closeness_scores() {
        let seed = url("https://example.com/docs/");
        assert_eq!(closeness(&url("https://www.example.com/docs"), &seed), 2);
        assert_eq!(closeness(&url("https://example.com/docs/intro"), &seed), 1);
        assert_eq!(closeness(&url("https://example.com/docsearch"), &seed), 0);
        assert_eq!(closeness(&url("https://example.com/blog"), &seed), 0);
        assert_eq!(closeness(&url("https://other.com/docs"), &seed), 0);
    }

    #[test]
    fn test_root_seed_makes_every_page_a_prefix_match() {
        let seed = url("https://example.com/");
        assert_eq!(closeness(&url("https://example.com/"), &seed), 2);
        assert_eq!(closeness(&url("https://example.com/anything"), &seed), 1);
    }

    #[test]
    fn test_rank_orders_by_score_then_recency() {
        let seed = url("https://example.com/docs");
        let at = |d| Some(Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap());
        let mut entries = vec![
            SitemapEntry::new(url("https://example.com/blog"), at(20)),
            SitemapEntry::new(url("https://example.com/docs/old"), at(1)),
            SitemapEntry::new(url("https://example.com/docs/undated"), None),
            SitemapEntry::new(url("https://example.com/docs/new"), at(15)),
            SitemapEntry::new(url("https://example.com/docs"), None),
        ];

        rank(&mut entries, &seed);
        let order: Vec<&str> = entries.iter().map(|e| e.url.path()).collect();
        assert_eq!(
            order,
            vec!["/docs", "/docs/new", "/docs/old", "/docs/undated", "/blog"]
        );
    }
}
