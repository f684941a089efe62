use serde::Deserialize;
use std::fmt;
use url::Url;

use super::domain::{extract_host, registrable_domain};

/// How far from the seed a crawl may wander
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum ScopeStrategy {
    /// Any host sharing the seed's registrable domain
    #[serde(rename = "same-domain")]
    #[default]
    SameDomain,

    /// Only the seed's exact hostname
    #[serde(rename = "same-hostname")]
    SameHostname,
}

impl fmt::Display for ScopeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeStrategy::SameDomain => write!(f, "same-domain"),
            ScopeStrategy::SameHostname => write!(f, "same-hostname"),
        }
    }
}

/// Decides whether `candidate` belongs to the same crawl as `reference`
///
/// Used both for discovered links and for redirect targets. URLs without a
/// host are never in scope.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_sweep::url::{in_scope, ScopeStrategy};
///
/// let seed = Url::parse("https://example.com/").unwrap();
/// let blog = Url::parse("https://blog.example.com/post").unwrap();
///
/// assert!(in_scope(&blog, &seed, ScopeStrategy::SameDomain));
/// assert!(!in_scope(&blog, &seed, ScopeStrategy::SameHostname));
/// ```
pub fn in_scope(candidate: &Url, reference: &Url, strategy: ScopeStrategy) -> bool {
    let pair = match strategy {
        ScopeStrategy::SameDomain => (registrable_domain(candidate), registrable_domain(reference)),
        ScopeStrategy::SameHostname => (extract_host(candidate), extract_host(reference)),
    };

    match pair {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_same_hostname() {
        let seed = url("https://example.com/");
        assert!(in_scope(&url("http://example.com/a"), &seed, ScopeStrategy::SameHostname));
        assert!(!in_scope(&url("https://www.example.com/a"), &seed, ScopeStrategy::SameHostname));
        assert!(!in_scope(&url("https://other.com/a"), &seed, ScopeStrategy::SameHostname));
    }

    #[test]
    fn test_same_domain() {
        let seed = url("https://www.example.com/");
        assert!(in_scope(&url("https://shop.example.com/"), &seed, ScopeStrategy::SameDomain));
        assert!(in_scope(&url("https://example.com/x"), &seed, ScopeStrategy::SameDomain));
        assert!(!in_scope(&url("https://example.org/"), &seed, ScopeStrategy::SameDomain));
        assert!(!in_scope(&url("https://notexample.com/"), &seed, ScopeStrategy::SameDomain));
    }

    #[test]
    fn test_hostname_match_implies_domain_match() {
        let reference = url("https://docs.example.com/start");
        let candidates = [
            "https://docs.example.com/other",
            "https://api.example.com/",
            "https://example.com/",
            "https://other.net/",
            "http://127.0.0.1:8080/",
            "mailto:someone@example.com",
        ];

        for c in candidates {
            let c = url(c);
            if in_scope(&c, &reference, ScopeStrategy::SameHostname) {
                assert!(in_scope(&c, &reference, ScopeStrategy::SameDomain), "{}", c);
            }
        }
        // ...but not the other way around
        let sibling = url("https://api.example.com/");
        assert!(in_scope(&sibling, &reference, ScopeStrategy::SameDomain));
        assert!(!in_scope(&sibling, &reference, ScopeStrategy::SameHostname));
    }

    #[test]
    fn test_hostless_urls_are_out_of_scope() {
        let seed = url("https://example.com/");
        let mail = url("mailto:a@example.com");
        assert!(!in_scope(&mail, &seed, ScopeStrategy::SameDomain));
        assert!(!in_scope(&mail, &seed, ScopeStrategy::SameHostname));
    }
}
