//! Output module for crawl statistics
//!
//! Reads bucket counts either from a finished crawl's in-memory results or
//! from a run stored in the dataset, and prints them.

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};
