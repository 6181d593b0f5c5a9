// File: src/storage/sqlite/schema.rs

use crate::error::JsonDbResult;
use rusqlite::{Connection, OptionalExtension};

/// Current schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Create the row and config tables (idempotent)
pub fn create_tables(conn: &Connection) -> JsonDbResult<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    let now = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);
    conn.execute(
        "INSERT OR REPLACE INTO jsondb_config (key, value, updated_at) VALUES ('schema_version', ?1, ?2)",
        rusqlite::params![SCHEMA_VERSION.to_string(), now],
    )?;
    Ok(())
}

/// Drop the row and config tables (idempotent)
pub fn drop_tables(conn: &Connection) -> JsonDbResult<()> {
    conn.execute_batch(DROP_SQL)?;
    Ok(())
}

/// Recorded schema version, if the config table has one
pub fn schema_version(conn: &Connection) -> JsonDbResult<Option<u32>> {
    let version: Option<String> = conn
        .query_row(
            "SELECT value FROM jsondb_config WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(version.and_then(|v| v.parse().ok()))
}

const SCHEMA_SQL: &str = r#"
-- Store configuration
CREATE TABLE IF NOT EXISTS jsondb_config (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Flattened documents, one row per leaf
CREATE TABLE IF NOT EXISTS jsondb (
    path TEXT PRIMARY KEY,                  -- escaped, '/'-terminated
    value TEXT NOT NULL,                    -- type tag + payload
    ovalue TEXT                             -- original number text
) WITHOUT ROWID;
"#;

const DROP_SQL: &str = r#"
DROP TABLE IF EXISTS jsondb;
DROP TABLE IF EXISTS jsondb_config;
"#;
