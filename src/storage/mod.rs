//! Storage module for persisting the run dataset
//!
//! This module handles all database operations for a crawl, including:
//! - SQLite database initialization and schema management
//! - Run tracking under a per-run token
//! - Content-addressed, append-only page records
//! - PDF handoff records

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use sha2::{Digest, Sha256};

use crate::state::Bucket;

/// A persisted page classification
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub id: String,
    pub run_token: String,
    pub bucket: Bucket,
    pub url: String,
    pub actual_url: Option<String>,
    pub page_title: Option<String>,
    pub http_status: u16,
    pub metadata: String,
    /// Scanner result as JSON
    pub scan_result: Option<String>,
    pub recorded_at: String,
}

/// Represents a crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub token: String,
    pub seed: String,
    pub config_hash: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Aborted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "aborted" => Some(Self::Aborted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Per-run token: first 16 hex chars of `sha256(config_hash || started_at)`
pub fn run_token(config_hash: &str, started_at: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(config_hash.as_bytes());
    hasher.update(started_at.as_bytes());
    hex::encode(hasher.finalize())[..16].to_string()
}

/// Content address of a page record: `sha256(run_token || bucket || url)`
pub fn record_id(run_token: &str, bucket: Bucket, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(run_token.as_bytes());
    hasher.update(bucket.to_db_string().as_bytes());
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
