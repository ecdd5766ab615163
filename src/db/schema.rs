//! SQL DDL for the journal tables.
//!
//! Defines the `entries`, `journal_log`, and `schema_meta` tables. The
//! `sessions` table arrives with migration v2. All DDL uses `IF NOT EXISTS` for
//! idempotent initialization.

use rusqlite::Connection;

/// Schema v1 DDL.
const SCHEMA_SQL: &str = r#"
-- Committed journal entries (append-only apart from purges)
CREATE TABLE IF NOT EXISTS entries (
    id TEXT PRIMARY KEY,
    prompt TEXT NOT NULL,
    structured TEXT NOT NULL CHECK(json_valid(structured)),
    journal_date TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entries_journal_date ON entries(journal_date);
CREATE INDEX IF NOT EXISTS idx_entries_created_at ON entries(created_at);

-- Audit log
CREATE TABLE IF NOT EXISTS journal_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    operation TEXT NOT NULL CHECK(operation IN ('append','purge')),
    entry_id TEXT NOT NULL,
    details TEXT,
    created_at TEXT NOT NULL
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize the v1 tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
