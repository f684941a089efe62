//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the run dataset.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per crawl run
CREATE TABLE IF NOT EXISTS runs (
    token TEXT PRIMARY KEY,
    seed TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    status TEXT NOT NULL
);

-- One row per classified page; id is a content address, rows are never updated
CREATE TABLE IF NOT EXISTS page_records (
    id TEXT PRIMARY KEY,
    run_token TEXT NOT NULL REFERENCES runs(token),
    bucket TEXT NOT NULL,
    url TEXT NOT NULL,
    actual_url TEXT,
    page_title TEXT,
    http_status INTEGER NOT NULL,
    metadata TEXT NOT NULL,
    scan_result TEXT,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_page_records_run ON page_records(run_token);
CREATE INDEX IF NOT EXISTS idx_page_records_bucket ON page_records(run_token, bucket);

-- PDFs handed to the external PDF pipeline
CREATE TABLE IF NOT EXISTS pdf_handoffs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_token TEXT NOT NULL REFERENCES runs(token),
    url TEXT NOT NULL,
    file_path TEXT NOT NULL,
    handed_off_at TEXT NOT NULL,
    UNIQUE(run_token, url)
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["runs", "page_records", "pdf_handoffs"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
