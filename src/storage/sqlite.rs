//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;

use crate::scanner::PdfDocument;
use crate::state::{Bucket, PageInfo};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{record_id, run_token, PageRecord, RunRecord, RunStatus};
use crate::SweepError;

const RUN_COLUMNS: &str = "token, seed, config_hash, started_at, finished_at, status";

const PAGE_COLUMNS: &str =
    "id, run_token, bucket, url, actual_url, page_title, http_status, metadata, scan_result, recorded_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the dataset at `path`
    pub fn new(path: &Path) -> Result<Self, SweepError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self, SweepError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        token: row.get(0)?,
        seed: row.get(1)?,
        config_hash: row.get(2)?,
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?).unwrap_or(RunStatus::Running),
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    let bucket: String = row.get(2)?;
    Ok(PageRecord {
        id: row.get(0)?,
        run_token: row.get(1)?,
        bucket: Bucket::from_db_string(&bucket).unwrap_or(Bucket::Error),
        url: row.get(3)?,
        actual_url: row.get(4)?,
        page_title: row.get(5)?,
        http_status: row.get(6)?,
        metadata: row.get(7)?,
        scan_result: row.get(8)?,
        recorded_at: row.get(9)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, seed: &str, config_hash: &str) -> StorageResult<RunRecord> {
        let started_at = Utc::now().to_rfc3339();
        let token = run_token(config_hash, &started_at);

        self.conn.execute(
            "INSERT INTO runs (token, seed, config_hash, started_at, status) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![token, seed, config_hash, started_at, RunStatus::Running.to_db_string()],
        )?;

        Ok(RunRecord {
            token,
            seed: seed.to_string(),
            config_hash: config_hash.to_string(),
            started_at,
            finished_at: None,
            status: RunStatus::Running,
        })
    }

    fn get_run(&self, token: &str) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE token = ?1", RUN_COLUMNS),
                params![token],
                run_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::RunNotFound(token.to_string()))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM runs ORDER BY started_at DESC, rowid DESC LIMIT 1",
                    RUN_COLUMNS
                ),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(&mut self, token: &str, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE token = ?3",
            params![status.to_db_string(), now, token],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(token.to_string()));
        }
        Ok(())
    }

    // ===== Page Records =====

    fn record_page(&mut self, token: &str, bucket: Bucket, info: &PageInfo) -> StorageResult<bool> {
        let scan_result = info
            .scan_result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO page_records
                (id, run_token, bucket, url, actual_url, page_title, http_status, metadata, scan_result, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record_id(token, bucket, &info.url),
                token,
                bucket.to_db_string(),
                info.url,
                info.actual_url,
                info.page_title,
                info.http_status_code,
                info.metadata,
                scan_result,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(inserted > 0)
    }

    fn get_pages(&self, token: &str, bucket: Option<Bucket>) -> StorageResult<Vec<PageRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM page_records
             WHERE run_token = ?1 AND (?2 IS NULL OR bucket = ?2)
             ORDER BY rowid",
            PAGE_COLUMNS
        ))?;

        let pages = stmt
            .query_map(params![token, bucket.map(|b| b.to_db_string())], page_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pages)
    }

    fn count_by_bucket(&self, token: &str) -> StorageResult<BTreeMap<Bucket, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT bucket, COUNT(*) FROM page_records WHERE run_token = ?1 GROUP BY bucket",
        )?;

        let mut counts = BTreeMap::new();
        let rows = stmt.query_map(params![token], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (bucket, count) = row?;
            if let Some(bucket) = Bucket::from_db_string(&bucket) {
                counts.insert(bucket, count as u64);
            }
        }
        Ok(counts)
    }

    // ===== PDF Handoffs =====

    fn record_pdf_handoff(&mut self, token: &str, document: &PdfDocument) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO pdf_handoffs (run_token, url, file_path, handed_off_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                token,
                document.url,
                document.downloaded_file_path.to_string_lossy(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn count_pdf_handoffs(&self, token: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pdf_handoffs WHERE run_token = ?1",
            params![token],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
