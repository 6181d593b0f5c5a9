// File: src/storage/index.rs

//! Secondary indexes over document fields
//!
//! Each declared `(collection, field)` pair owns a table of
//! `(value, path)` rows: the encoded scalar at `<collection>/<doc>/<field>`
//! and the owning document path. Tables are maintained inside the write
//! transaction, so after every commit they mirror the live documents.

use super::path::{self, DbPath};
use super::query;
use super::value;
use crate::error::{JsonDbError, JsonDbResult};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

/// A declared index: documents of `collection` keyed by `field`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Index {
    /// Collection path, e.g. `/connections`
    pub collection: String,

    /// Field path inside each document, e.g. `configuredProperties/url`
    pub field: String,
}

impl Index {
    pub fn new(collection: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            field: field.into(),
        }
    }

    /// Parse `collection#field`
    pub fn parse(spec: &str) -> JsonDbResult<Self> {
        match spec.split_once('#') {
            Some((collection, field)) if !collection.trim().is_empty() && !field.trim().is_empty() => {
                Ok(Self::new(collection.trim(), field.trim()))
            }
            _ => Err(JsonDbError::Config(format!(
                "index must be written as collection#field, got {spec:?}"
            ))),
        }
    }
}

/// A declared index resolved to storage paths and its table
#[derive(Debug, Clone)]
pub struct IndexDef {
    pub index: Index,
    pub collection: DbPath,
    pub field: DbPath,
    pub table: String,
}

impl IndexDef {
    fn resolve(index: &Index) -> JsonDbResult<Self> {
        let collection = path::normalize(&index.collection)?;
        let field = path::normalize(&index.field)?;
        if field.is_root() {
            return Err(JsonDbError::Config(format!(
                "index field must not be empty: {}#{}",
                index.collection, index.field
            )));
        }
        let table = table_name(&collection, &field);
        Ok(Self {
            index: index.clone(),
            collection,
            field,
            table,
        })
    }

    /// Document of this index's collection containing `path`, if any
    fn document_of(&self, path: &DbPath) -> Option<DbPath> {
        let segments = self.collection.segments_below(path.as_str())?;
        segments.first().map(|doc| self.collection.child(doc))
    }
}

/// Table name for an index; hashed so any path maps to a valid identifier
pub fn table_name(collection: &DbPath, field: &DbPath) -> String {
    let digest = Sha256::digest(format!("{}#{}", collection.as_str(), field.as_str()));
    format!("jsondb_idx_{}", &hex::encode(digest)[..16])
}

/// Maintains every declared index
#[derive(Debug, Clone, Default)]
pub struct IndexManager {
    defs: Vec<IndexDef>,
}

impl IndexManager {
    pub fn new(indexes: &[Index]) -> JsonDbResult<Self> {
        let mut defs: Vec<IndexDef> = Vec::with_capacity(indexes.len());
        for index in indexes {
            let def = IndexDef::resolve(index)?;
            if !defs.iter().any(|d| d.table == def.table) {
                defs.push(def);
            }
        }
        Ok(Self { defs })
    }

    pub fn defs(&self) -> &[IndexDef] {
        &self.defs
    }

    /// Index covering exactly `(collection, field)`
    pub fn find(&self, collection: &DbPath, field: &DbPath) -> Option<&IndexDef> {
        self.defs
            .iter()
            .find(|d| d.collection == *collection && d.field == *field)
    }

    pub fn create_tables(&self, conn: &Connection) -> JsonDbResult<()> {
        for def in &self.defs {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    value TEXT NOT NULL,
                    path TEXT NOT NULL,
                    PRIMARY KEY (value, path)
                );
                CREATE INDEX IF NOT EXISTS {table}_path ON {table}(path);",
                table = def.table
            ))?;
        }
        Ok(())
    }

    pub fn drop_tables(&self, conn: &Connection) -> JsonDbResult<()> {
        for def in &self.defs {
            conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", def.table))?;
        }
        Ok(())
    }

    /// Repopulate every index from the row table
    pub fn rebuild_all(&self, conn: &Connection) -> JsonDbResult<()> {
        for def in &self.defs {
            let entries = self.rebuild(conn, def)?;
            debug!(table = %def.table, entries, "index rebuilt");
        }
        Ok(())
    }

    /// Bring every index in line with a write at `written`
    ///
    /// Returns the number of indexes touched.
    pub fn refresh(&self, conn: &Connection, written: &DbPath) -> JsonDbResult<usize> {
        let mut touched = 0;
        for def in &self.defs {
            if def.collection.starts_with(written) {
                self.rebuild(conn, def)?;
                touched += 1;
            } else if let Some(doc) = def.document_of(written) {
                self.reindex_document(conn, def, &doc)?;
                touched += 1;
            }
        }
        Ok(touched)
    }

    fn rebuild(&self, conn: &Connection, def: &IndexDef) -> JsonDbResult<usize> {
        conn.execute(&format!("DELETE FROM {}", def.table), [])?;
        let mut insert = conn.prepare_cached(&format!(
            "INSERT OR REPLACE INTO {} (value, path) VALUES (?1, ?2)",
            def.table
        ))?;
        let mut entries = 0;
        for (doc, encoded) in query::scan_field(conn, &def.collection, &def.field)? {
            if value::is_scalar(&encoded) {
                insert.execute(params![encoded, doc.as_str()])?;
                entries += 1;
            }
        }
        Ok(entries)
    }

    fn reindex_document(&self, conn: &Connection, def: &IndexDef, doc: &DbPath) -> JsonDbResult<()> {
        conn.prepare_cached(&format!("DELETE FROM {} WHERE path = ?1", def.table))?
            .execute(params![doc.as_str()])?;
        if let Some(row) = query::row_at(conn, &doc.join(&def.field))? {
            if value::is_scalar(&row.value) {
                conn.prepare_cached(&format!(
                    "INSERT OR REPLACE INTO {} (value, path) VALUES (?1, ?2)",
                    def.table
                ))?
                .execute(params![row.value, doc.as_str()])?;
            }
        }
        Ok(())
    }

    /// Document paths whose indexed field holds `encoded`, sorted
    pub fn lookup(&self, conn: &Connection, def: &IndexDef, encoded: &str) -> JsonDbResult<Vec<String>> {
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT path FROM {} WHERE value = ?1 ORDER BY path",
            def.table
        ))?;
        let paths = stmt
            .query_map(params![encoded], |row| row.get::<_, String>(0))?
            .map(|p| p.map(|p| DbPath::from_stored(p).display().to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(paths)
    }

    /// `(table, entries)` for every index
    pub fn entry_counts(&self, conn: &Connection) -> JsonDbResult<Vec<(String, u64)>> {
        self.defs
            .iter()
            .map(|def| -> JsonDbResult<(String, u64)> {
                let count: u64 =
                    conn.query_row(&format!("SELECT COUNT(*) FROM {}", def.table), [], |r| {
                        r.get(0)
                    })?;
                Ok((def.table.clone(), count))
            })
            .collect()
    }
}
