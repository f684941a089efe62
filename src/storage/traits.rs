//! Storage traits and error types
//!
//! This module defines the trait interface for dataset backends and
//! associated error types.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::scanner::PdfDocument;
use crate::state::{Bucket, PageInfo};
use crate::storage::{PageRecord, RunRecord, RunStatus};

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Append-only dataset of crawl runs
///
/// Records are keyed by content address, so writing the same classification
/// twice is a no-op.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new run and returns it with its token
    fn create_run(&mut self, seed: &str, config_hash: &str) -> StorageResult<RunRecord>;

    /// Gets a run by token
    fn get_run(&self, token: &str) -> StorageResult<RunRecord>;

    /// Gets the most recently started run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run finished with a terminal status
    fn finish_run(&mut self, token: &str, status: RunStatus) -> StorageResult<()>;

    // ===== Page Records =====

    /// Appends one classified page
    ///
    /// Returns false when the same record was already present.
    fn record_page(&mut self, token: &str, bucket: Bucket, info: &PageInfo) -> StorageResult<bool>;

    /// Pages of a run, optionally limited to one bucket, in insertion order
    fn get_pages(&self, token: &str, bucket: Option<Bucket>) -> StorageResult<Vec<PageRecord>>;

    /// Number of records per bucket for a run
    fn count_by_bucket(&self, token: &str) -> StorageResult<BTreeMap<Bucket, u64>>;

    // ===== PDF Handoffs =====

    fn record_pdf_handoff(&mut self, token: &str, document: &PdfDocument) -> StorageResult<()>;

    fn count_pdf_handoffs(&self, token: &str) -> StorageResult<u64>;
}
