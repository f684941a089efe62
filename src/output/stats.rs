//! Statistics generation from the run dataset
//!
//! This module provides functionality for extracting and displaying
//! per-bucket statistics of a crawl run.

use std::collections::BTreeMap;

use crate::state::{Bucket, CrawlResults};
use crate::storage::{RunRecord, Storage, StorageError};
use crate::SweepError;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    pub run: RunRecord,

    /// Wall-clock duration, when the run has finished
    pub duration_seconds: Option<u64>,

    /// Total number of classified pages
    pub total_pages: u64,

    /// Count of pages by bucket
    pub pages_by_bucket: BTreeMap<Bucket, u64>,

    /// Status codes of invalid and errored pages
    pub failure_codes: BTreeMap<u16, u64>,

    pub pdf_handoffs: u64,
}

impl CrawlStatistics {
    pub fn count(&self, bucket: Bucket) -> u64 {
        self.pages_by_bucket.get(&bucket).copied().unwrap_or(0)
    }

    /// Builds statistics straight from an in-memory result set
    pub fn from_results(run: RunRecord, results: &CrawlResults) -> Self {
        let pages_by_bucket: BTreeMap<Bucket, u64> = results
            .buckets
            .iter()
            .filter(|(_, pages)| !pages.is_empty())
            .map(|(bucket, pages)| (*bucket, pages.len() as u64))
            .collect();

        let mut failure_codes = BTreeMap::new();
        for bucket in [Bucket::Invalid, Bucket::Error] {
            for page in results.bucket(bucket) {
                *failure_codes.entry(page.http_status_code).or_insert(0) += 1;
            }
        }

        Self {
            duration_seconds: duration_of(&run),
            total_pages: results.total_classified() as u64,
            pages_by_bucket,
            failure_codes,
            pdf_handoffs: 0,
            run,
        }
    }
}

/// Loads statistics for a run from storage
///
/// Uses the most recent run when `token` is `None`.
pub fn load_statistics(storage: &dyn Storage, token: Option<&str>) -> Result<CrawlStatistics, SweepError> {
    let run = match token {
        Some(token) => storage.get_run(token)?,
        None => storage
            .get_latest_run()?
            .ok_or_else(|| StorageError::RunNotFound("no runs in dataset".to_string()))?,
    };

    let pages_by_bucket = storage.count_by_bucket(&run.token)?;

    let mut failure_codes = BTreeMap::new();
    for bucket in [Bucket::Invalid, Bucket::Error] {
        for page in storage.get_pages(&run.token, Some(bucket))? {
            *failure_codes.entry(page.http_status).or_insert(0) += 1;
        }
    }

    Ok(CrawlStatistics {
        duration_seconds: duration_of(&run),
        total_pages: pages_by_bucket.values().sum(),
        pdf_handoffs: storage.count_pdf_handoffs(&run.token)?,
        pages_by_bucket,
        failure_codes,
        run,
    })
}

fn duration_of(run: &RunRecord) -> Option<u64> {
    let started = run.started_at.parse::<chrono::DateTime<chrono::Utc>>().ok()?;
    let finished = run.finished_at.as_ref()?.parse::<chrono::DateTime<chrono::Utc>>().ok()?;
    Some((finished - started).num_seconds().max(0) as u64)
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Run:");
    println!("  Token: {}", stats.run.token);
    println!("  Seed: {}", stats.run.seed);
    println!("  Status: {}", stats.run.status.to_db_string());
    if let Some(seconds) = stats.duration_seconds {
        println!("  Duration: {}s", seconds);
    }
    println!();

    println!("Pages by Bucket:");
    for bucket in Bucket::all() {
        let count = stats.count(bucket);
        if count == 0 {
            continue;
        }
        let percentage = if stats.total_pages > 0 {
            (count as f64 / stats.total_pages as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", bucket, count, percentage);
    }
    println!("  total: {}", stats.total_pages);
    println!();

    if !stats.failure_codes.is_empty() {
        println!("Failure Codes:");
        for (code, count) in &stats.failure_codes {
            println!("  {} {}: {}", code, crate::state::status::describe(*code), count);
        }
        println!();
    }

    if stats.pdf_handoffs > 0 {
        println!("PDFs handed off: {}\n", stats.pdf_handoffs);
    }

    let scanned = stats.count(Bucket::Scanned);
    let attempted = scanned + stats.count(Bucket::Invalid) + stats.count(Bucket::Error);
    let success_rate = if attempted > 0 {
        (scanned as f64 / attempted as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Scan Rate: {:.1}% ({} / {} visited pages scanned)",
        success_rate, scanned, attempted
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{CrawlState, PageInfo, Request};
    use crate::storage::{RunStatus, SqliteStorage};
    use url::Url;

    #[test]
    fn test_load_statistics() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run = storage.create_run("https://example.com/", "cfg").unwrap();
        storage
            .record_page(&run.token, Bucket::Scanned, &PageInfo::new("https://example.com/", 200))
            .unwrap();
        storage
            .record_page(&run.token, Bucket::Invalid, &PageInfo::new("https://example.com/gone", 404))
            .unwrap();
        storage
            .record_page(&run.token, Bucket::Error, &PageInfo::new("https://example.com/slow", 2))
            .unwrap();
        storage.finish_run(&run.token, RunStatus::Completed).unwrap();

        let stats = load_statistics(&storage, None).unwrap();
        assert_eq!(stats.run.token, run.token);
        assert_eq!(stats.total_pages, 3);
        assert_eq!(stats.count(Bucket::Scanned), 1);
        assert_eq!(stats.failure_codes.get(&404), Some(&1));
        assert_eq!(stats.failure_codes.get(&2), Some(&1));
        assert!(stats.duration_seconds.is_some());
    }

    #[test]
    fn test_load_statistics_without_runs() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(load_statistics(&storage, None).is_err());
        assert!(load_statistics(&storage, Some("missing")).is_err());
    }

    #[test]
    fn test_from_results() {
        let state = CrawlState::new(10);
        let url = Url::parse("https://example.com/").unwrap();
        state.enqueue_if_new(Request::new(url.clone()));
        state.enqueue_if_new(Request::new(Url::parse("https://example.com/later").unwrap()));
        let request = state.next_request().unwrap();
        state.commit_scan(&request, &url, PageInfo::new(url.as_str(), 200));
        let results = state.finalize();

        let run = RunRecord {
            token: "t".into(),
            seed: url.to_string(),
            config_hash: "h".into(),
            started_at: "2024-01-01T00:00:00Z".into(),
            finished_at: Some("2024-01-01T00:01:30Z".into()),
            status: RunStatus::Aborted,
        };
        let stats = CrawlStatistics::from_results(run, &results);
        assert_eq!(stats.total_pages, 2);
        assert_eq!(stats.count(Bucket::ExceededRequests), 1);
        assert_eq!(stats.duration_seconds, Some(90));
        assert!(stats.failure_codes.is_empty());
    }
}
