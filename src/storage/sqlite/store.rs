// File: src/storage/sqlite/store.rs

use super::config::{SqliteConfig, StorageStats};
use super::deadline::Deadline;
use super::schema;
use crate::config::Config;
use crate::error::{JsonDbError, JsonDbResult, StorageError};
use crate::key::KeyGenerator;
use crate::storage::events::{ChangeEvent, ChangeListener};
use crate::storage::index::{Index, IndexManager};
use crate::storage::path::{self, DbPath};
use crate::traits::{GetOptions, JsonDb};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, trace};

/// SQLite implementation of the JsonDb trait
///
/// Clones share the connection and every handle setting.
#[derive(Clone)]
pub struct SqlJsonDb {
    /// Database connection (one transaction at a time)
    conn: Arc<Mutex<Connection>>,

    config: SqliteConfig,

    /// Declared secondary indexes
    pub(crate) indexes: IndexManager,

    /// Collections read back as arrays of their generated-key children
    pub(crate) lists: Vec<DbPath>,

    pub(crate) keys: Arc<KeyGenerator>,

    /// Notified after each committed write
    listener: Option<ChangeListener>,
}

impl SqlJsonDb {
    /// Create a store on the database file at `path` with default configuration
    pub fn new<P: AsRef<Path>>(path: P) -> JsonDbResult<Self> {
        let config = SqliteConfig {
            path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        };
        Self::with_config(config)
    }

    /// Create with custom configuration
    pub fn with_config(config: SqliteConfig) -> JsonDbResult<Self> {
        let conn = Connection::open(&config.path).map_err(|e| {
            JsonDbError::Backend(StorageError::ConnectionFailed(format!(
                "failed to open db: {}",
                e
            )))
        })?;

        Self::configure_connection(&conn, &config)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
            indexes: IndexManager::default(),
            lists: Vec::new(),
            keys: Arc::new(KeyGenerator::new()),
            listener: None,
        })
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> JsonDbResult<Self> {
        let config = SqliteConfig {
            path: ":memory:".to_string(),
            ..Default::default()
        };
        Self::with_config(config)
    }

    /// Open the store described by an application [`Config`]
    pub fn open(config: &Config) -> JsonDbResult<Self> {
        Self::with_config(config.sqlite())?
            .with_indexes(&config.indexes)?
            .with_list_collections(&config.list_collections)
    }

    /// Declare the secondary indexes maintained by this handle
    pub fn with_indexes(mut self, indexes: &[Index]) -> JsonDbResult<Self> {
        self.indexes = IndexManager::new(indexes)?;
        Ok(self)
    }

    /// Declare collections whose generated-key children read back as an array
    pub fn with_list_collections<S: AsRef<str>>(mut self, paths: &[S]) -> JsonDbResult<Self> {
        self.lists = paths
            .iter()
            .map(|p| path::normalize(p.as_ref()))
            .collect::<JsonDbResult<_>>()?;
        Ok(self)
    }

    /// Share a key generator with other handles
    pub fn with_key_generator(mut self, keys: Arc<KeyGenerator>) -> Self {
        self.keys = keys;
        self
    }

    /// Register a callback for committed changes
    ///
    /// `set`, `create` and `push` report the written path, `update` reports
    /// each top-level member path, and `delete` reports the path only if
    /// something was removed. Failed or rolled-back writes report nothing.
    pub fn with_listener(mut self, listener: ChangeListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub(crate) fn notify(&self, event: ChangeEvent, path: &DbPath) {
        if let Some(listener) = &self.listener {
            trace!(%event, path = %path, "notifying listener");
            listener(event, &path.caller_path());
        }
    }

    /// Configure SQLite connection pragmas
    fn configure_connection(conn: &Connection, config: &SqliteConfig) -> JsonDbResult<()> {
        if config.wal_mode {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }
        conn.pragma_update(None, "busy_timeout", config.busy_timeout_ms)?;
        // Performance optimizations
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "cache_size", -64000)?; // 64MB cache
        Ok(())
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    pub fn indexes(&self) -> &IndexManager {
        &self.indexes
    }

    pub fn key_generator(&self) -> Arc<KeyGenerator> {
        Arc::clone(&self.keys)
    }

    /// A view of this store whose operations carry `timeout` as deadline
    pub fn with_timeout(&self, timeout: Duration) -> Bounded<'_> {
        Bounded { db: self, timeout }
    }

    /// Get database statistics
    pub fn stats(&self) -> JsonDbResult<StorageStats> {
        self.transact(self.deadline(), "stats", TransactionBehavior::Deferred, |tx| {
            let row_count: u64 = tx.query_row("SELECT COUNT(*) FROM jsondb", [], |r| r.get(0))?;
            Ok(StorageStats {
                row_count,
                schema_version: schema::schema_version(tx)?,
                index_entries: self.indexes.entry_counts(tx)?,
            })
        })
    }

    /// Compact the database (VACUUM)
    pub fn compact(&self) -> JsonDbResult<()> {
        let conn = self.lock(&self.deadline(), "compact")?;
        conn.execute("VACUUM", [])?;
        info!(path = %self.config.path, "database compacted");
        Ok(())
    }

    pub(crate) fn deadline(&self) -> Deadline {
        Deadline::after(self.config.op_timeout)
    }

    /// Get locked connection, waiting no longer than the deadline allows
    pub(crate) fn lock(
        &self,
        deadline: &Deadline,
        operation: &'static str,
    ) -> JsonDbResult<MutexGuard<'_, Connection>> {
        match deadline.remaining() {
            None => Ok(self.conn.lock()),
            Some(left) => self
                .conn
                .try_lock_for(left)
                .ok_or_else(|| deadline.expired(operation)),
        }
    }

    /// Run `f` inside one transaction
    ///
    /// The deadline is checked before any statement runs and again before
    /// commit. Any error drops the transaction, which rolls it back.
    pub(crate) fn transact<T>(
        &self,
        deadline: Deadline,
        operation: &'static str,
        behavior: TransactionBehavior,
        f: impl FnOnce(&Transaction<'_>) -> JsonDbResult<T>,
    ) -> JsonDbResult<T> {
        let mut conn = self.lock(&deadline, operation)?;
        deadline.check(operation)?;

        let tx = conn.transaction_with_behavior(behavior)?;
        let result = f(&tx)?;

        deadline.check(operation)?;
        tx.commit()?;
        Ok(result)
    }

    pub(crate) fn create_tables_impl(&self, deadline: Deadline) -> JsonDbResult<()> {
        self.transact(deadline, "create_tables", TransactionBehavior::Immediate, |tx| {
            schema::create_tables(tx)?;
            self.indexes.create_tables(tx)?;
            self.indexes.rebuild_all(tx)
        })?;
        info!(
            path = %self.config.path,
            indexes = self.indexes.defs().len(),
            "tables created"
        );
        Ok(())
    }

    pub(crate) fn drop_tables_impl(&self, deadline: Deadline) -> JsonDbResult<()> {
        self.transact(deadline, "drop_tables", TransactionBehavior::Immediate, |tx| {
            self.indexes.drop_tables(tx)?;
            schema::drop_tables(tx)
        })?;
        info!(path = %self.config.path, "tables dropped");
        Ok(())
    }
}

impl JsonDb for SqlJsonDb {
    fn get(&self, path: &str, options: &GetOptions) -> JsonDbResult<Option<Vec<u8>>> {
        self.get_impl(path, options, self.deadline())
    }

    fn set(&self, path: &str, json: &[u8]) -> JsonDbResult<()> {
        self.set_impl(path, json, self.deadline())
    }

    fn update(&self, path: &str, json: &[u8]) -> JsonDbResult<()> {
        self.update_impl(path, json, self.deadline())
    }

    fn create(&self, path: &str, json: &[u8]) -> JsonDbResult<()> {
        self.create_impl(path, json, self.deadline())
    }

    fn push(&self, path: &str, json: &[u8]) -> JsonDbResult<String> {
        self.push_impl(path, json, self.deadline())
    }

    fn delete(&self, path: &str) -> JsonDbResult<bool> {
        self.delete_impl(path, self.deadline())
    }

    fn exists(&self, path: &str) -> JsonDbResult<bool> {
        self.exists_impl(path, self.deadline())
    }

    fn fetch_ids_by_property_value(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> JsonDbResult<Vec<String>> {
        self.fetch_ids_impl(collection, field, value, self.deadline())
    }

    fn create_key(&self) -> String {
        self.keys.next_key()
    }

    fn create_tables(&self) -> JsonDbResult<()> {
        self.create_tables_impl(self.deadline())
    }

    fn drop_tables(&self) -> JsonDbResult<()> {
        self.drop_tables_impl(self.deadline())
    }
}

/// A store view whose every operation runs under a fixed deadline
///
/// Created by [`SqlJsonDb::with_timeout`].
pub struct Bounded<'a> {
    db: &'a SqlJsonDb,
    timeout: Duration,
}

impl Bounded<'_> {
    fn deadline(&self) -> Deadline {
        Deadline::after(Some(self.timeout))
    }
}

impl JsonDb for Bounded<'_> {
    fn get(&self, path: &str, options: &GetOptions) -> JsonDbResult<Option<Vec<u8>>> {
        self.db.get_impl(path, options, self.deadline())
    }

    fn set(&self, path: &str, json: &[u8]) -> JsonDbResult<()> {
        self.db.set_impl(path, json, self.deadline())
    }

    fn update(&self, path: &str, json: &[u8]) -> JsonDbResult<()> {
        self.db.update_impl(path, json, self.deadline())
    }

    fn create(&self, path: &str, json: &[u8]) -> JsonDbResult<()> {
        self.db.create_impl(path, json, self.deadline())
    }

    fn push(&self, path: &str, json: &[u8]) -> JsonDbResult<String> {
        self.db.push_impl(path, json, self.deadline())
    }

    fn delete(&self, path: &str) -> JsonDbResult<bool> {
        self.db.delete_impl(path, self.deadline())
    }

    fn exists(&self, path: &str) -> JsonDbResult<bool> {
        self.db.exists_impl(path, self.deadline())
    }

    fn fetch_ids_by_property_value(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> JsonDbResult<Vec<String>> {
        self.db
            .fetch_ids_impl(collection, field, value, self.deadline())
    }

    fn create_key(&self) -> String {
        self.db.create_key()
    }

    fn create_tables(&self) -> JsonDbResult<()> {
        self.db.create_tables_impl(self.deadline())
    }

    fn drop_tables(&self) -> JsonDbResult<()> {
        self.db.drop_tables_impl(self.deadline())
    }
}
