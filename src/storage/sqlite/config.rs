// File: src/storage/sqlite/config.rs

use std::time::Duration;

/// SQLite storage backend configuration
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path to database file (or ":memory:" for in-memory)
    pub path: String,

    /// Enable WAL mode for better concurrency
    pub wal_mode: bool,

    /// Busy timeout in milliseconds
    pub busy_timeout_ms: u32,

    /// Default deadline for every operation (None = unbounded)
    pub op_timeout: Option<Duration>,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "jsondb.db".to_string(),
            wal_mode: true, // Enable WAL for concurrent reads
            busy_timeout_ms: 5000,
            op_timeout: None,
        }
    }
}

/// Storage statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Total rows in the row table
    pub row_count: u64,

    /// Schema version recorded in the config table
    pub schema_version: Option<u32>,

    /// `(table, entries)` per declared index
    pub index_entries: Vec<(String, u64)>,
}
