//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `Request`: a unit of work in the frontier
//! - `PageInfo`: the outcome record of one classified URL
//! - `Bucket`: the terminal classification a URL ends up in
//! - `CrawlState`: dedup index, pending queue and buckets shared by all workers

mod bucket;
mod crawl_state;
mod request;
pub mod status;

// Re-export main types
pub use bucket::Bucket;
pub use crawl_state::{ClassifiedPage, CrawlResults, CrawlState, Enqueue, ScanCommit};
pub use request::{PageInfo, RedirectPair, Request};
