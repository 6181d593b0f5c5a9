//! Test fixtures and store setup utilities

use jsondb::{Index, JsonDb, SqlJsonDb, SqliteConfig};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Create an in-memory store with tables
pub fn test_store() -> SqlJsonDb {
    let store = SqlJsonDb::in_memory().expect("Failed to create in-memory store");
    store.create_tables().expect("Failed to create tables");
    store
}

/// Create an in-memory store with the given indexes declared
pub fn test_store_with_indexes(indexes: &[Index]) -> SqlJsonDb {
    let store = SqlJsonDb::in_memory()
        .expect("Failed to create in-memory store")
        .with_indexes(indexes)
        .expect("Failed to declare indexes");
    store.create_tables().expect("Failed to create tables");
    store
}

/// Create a store on a database file inside a fresh temporary directory
///
/// The directory must outlive the store.
pub fn file_store() -> (TempDir, SqlJsonDb) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = open_file_store(&dir);
    store.create_tables().expect("Failed to create tables");
    (dir, store)
}

/// Open another handle on the database inside `dir`
pub fn open_file_store(dir: &TempDir) -> SqlJsonDb {
    let config = SqliteConfig {
        path: dir.path().join("jsondb.db").to_string_lossy().to_string(),
        ..Default::default()
    };
    SqlJsonDb::with_config(config).expect("Failed to open file store")
}

/// Index over connection URLs
pub fn url_index() -> Index {
    Index::new("/connections", "configuredProperties/url")
}

/// A connection document
pub fn connection(name: &str, url: &str) -> Value {
    json!({
        "name": name,
        "connectorId": "http",
        "configuredProperties": {
            "url": url,
            "timeout": 30
        },
        "tags": ["prod", "eu"]
    })
}

/// Serialize a value for the byte-oriented store API
pub fn bytes(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).expect("Failed to serialize")
}
