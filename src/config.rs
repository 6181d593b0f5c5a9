//! Store configuration

use crate::error::JsonDbResult;
use crate::storage::{Index, SqliteConfig};
use std::time::Duration;

/// Store configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub log_level: String,
    /// Enable SQLite WAL journaling
    pub wal_mode: bool,
    /// SQLite busy timeout for cross-process lock waits
    pub busy_timeout_ms: u32,
    /// Default per-operation deadline (None = unbounded)
    pub op_timeout_ms: Option<u64>,
    /// Declared secondary indexes
    pub indexes: Vec<Index>,
    /// Collections read back as arrays of their generated-key children
    pub list_collections: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "./jsondb.db".to_string(),
            log_level: "info".to_string(),
            wal_mode: true,
            busy_timeout_ms: 5000,
            op_timeout_ms: None,
            indexes: vec![],
            list_collections: vec![],
        }
    }
}

impl Config {
    /// Load from environment variables
    ///
    /// Unset or unparseable scalars fall back to their defaults; a malformed
    /// index declaration is an error.
    pub fn from_env() -> JsonDbResult<Self> {
        let defaults = Self::default();

        let database_path =
            std::env::var("JSONDB_DATABASE_PATH").unwrap_or(defaults.database_path);

        let log_level = std::env::var("JSONDB_LOG_LEVEL").unwrap_or(defaults.log_level);

        let wal_mode = std::env::var("JSONDB_WAL_MODE")
            .ok()
            .map(|s| s == "true" || s == "1")
            .unwrap_or(defaults.wal_mode);

        let busy_timeout_ms = std::env::var("JSONDB_BUSY_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.busy_timeout_ms);

        let op_timeout_ms = std::env::var("JSONDB_OP_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok());

        let indexes = std::env::var("JSONDB_INDEXES")
            .ok()
            .map(|s| parse_indexes(&s))
            .transpose()?
            .unwrap_or_default();

        let list_collections = std::env::var("JSONDB_LIST_COLLECTIONS")
            .ok()
            .map(|s| split_list(&s))
            .unwrap_or_default();

        Ok(Self {
            database_path,
            log_level,
            wal_mode,
            busy_timeout_ms,
            op_timeout_ms,
            indexes,
            list_collections,
        })
    }

    /// Connection settings for the SQLite backend
    pub fn sqlite(&self) -> SqliteConfig {
        SqliteConfig {
            path: self.database_path.clone(),
            wal_mode: self.wal_mode,
            busy_timeout_ms: self.busy_timeout_ms,
            op_timeout: self.op_timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Parse `collection#field,collection#field`
pub fn parse_indexes(s: &str) -> JsonDbResult<Vec<Index>> {
    split_list(s).iter().map(|spec| Index::parse(spec)).collect()
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
