/// Outcome buckets for classified pages
///
/// Every discovered URL ends up in exactly one bucket.
use serde::Serialize;
use std::fmt;

/// The terminal classification of a discovered URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Bucket {
    // ===== Handed to the scanner =====
    /// Loaded and scanned successfully
    Scanned,

    // ===== Policy exclusions =====
    /// Redirected out of scope, or onto a page that was already scanned
    NotScannedRedirect,

    /// Final URL matched a blacklist pattern
    Blacklisted,

    /// Discovered link outside the crawl scope
    OutOfDomain,

    /// Disallowed by robots.txt
    Forbidden,

    /// Discovered link matching a blacklist pattern
    UserExcluded,

    // ===== Failures =====
    /// Status >= 300 or unsupported content
    Invalid,

    /// Navigation or scanner failure
    Error,

    // ===== Budget =====
    /// Never visited because the page cap or time budget ran out
    ExceededRequests,
}

impl Bucket {
    /// Returns true for buckets that represent a policy decision rather than a failure
    pub fn is_exclusion(&self) -> bool {
        matches!(
            self,
            Self::NotScannedRedirect
                | Self::Blacklisted
                | Self::OutOfDomain
                | Self::Forbidden
                | Self::UserExcluded
        )
    }

    /// Returns true for buckets that represent a failed visit
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Invalid | Self::Error)
    }

    /// Converts the bucket to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Scanned => "scanned",
            Self::NotScannedRedirect => "not_scanned_redirect",
            Self::Blacklisted => "blacklisted",
            Self::OutOfDomain => "out_of_domain",
            Self::Forbidden => "forbidden",
            Self::UserExcluded => "user_excluded",
            Self::Invalid => "invalid",
            Self::Error => "error",
            Self::ExceededRequests => "exceeded_requests",
        }
    }

    /// Parses a bucket from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "scanned" => Some(Self::Scanned),
            "not_scanned_redirect" => Some(Self::NotScannedRedirect),
            "blacklisted" => Some(Self::Blacklisted),
            "out_of_domain" => Some(Self::OutOfDomain),
            "forbidden" => Some(Self::Forbidden),
            "user_excluded" => Some(Self::UserExcluded),
            "invalid" => Some(Self::Invalid),
            "error" => Some(Self::Error),
            "exceeded_requests" => Some(Self::ExceededRequests),
            _ => None,
        }
    }

    /// Returns all buckets in reporting order
    pub fn all() -> [Self; 9] {
        [
            Self::Scanned,
            Self::NotScannedRedirect,
            Self::Blacklisted,
            Self::OutOfDomain,
            Self::Forbidden,
            Self::UserExcluded,
            Self::Invalid,
            Self::Error,
            Self::ExceededRequests,
        ]
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_string_roundtrip() {
        for bucket in Bucket::all() {
            assert_eq!(Bucket::from_db_string(bucket.to_db_string()), Some(bucket));
        }
        assert_eq!(Bucket::from_db_string("pending"), None);
    }

    #[test]
    fn test_categories_are_disjoint() {
        for bucket in Bucket::all() {
            assert!(!(bucket.is_exclusion() && bucket.is_failure()), "{}", bucket);
        }
        assert!(!Bucket::Scanned.is_exclusion());
        assert!(!Bucket::Scanned.is_failure());
        assert!(Bucket::Forbidden.is_exclusion());
        assert!(Bucket::Error.is_failure());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_string(&Bucket::NotScannedRedirect).unwrap();
        assert_eq!(json, "\"notScannedRedirect\"");
    }
}
