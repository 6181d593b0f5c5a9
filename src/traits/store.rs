//! Store trait definition

use super::options::GetOptions;
use crate::error::JsonDbResult;

/// Path-addressable JSON document store
///
/// Every operation runs in its own transaction: it either commits fully or
/// leaves no trace. Paths are `/`-separated (`/connections/:5/name`);
/// payloads are UTF-8 JSON text.
pub trait JsonDb: Send + Sync {
    /// Read the document at `path`
    ///
    /// Returns `None` when nothing is stored at or below the path.
    fn get(&self, path: &str, options: &GetOptions) -> JsonDbResult<Option<Vec<u8>>>;

    /// Read the document at `path` as a string
    fn get_as_string(&self, path: &str, options: &GetOptions) -> JsonDbResult<Option<String>> {
        Ok(self
            .get(path, options)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Replace everything at `path` with `json`
    fn set(&self, path: &str, json: &[u8]) -> JsonDbResult<()>;

    /// Deep-merge the object `json` into the existing document at `path`
    ///
    /// # Errors
    /// * `NotFound` - nothing is stored at `path`
    /// * `InvalidJson` - payload is not a JSON object
    fn update(&self, path: &str, json: &[u8]) -> JsonDbResult<()>;

    /// Write `json` at `path` only if nothing is stored there
    ///
    /// # Errors
    /// * `Conflict` - a document already exists
    fn create(&self, path: &str, json: &[u8]) -> JsonDbResult<()>;

    /// Store `json` under a freshly generated child key of `path`
    ///
    /// Returns the new key.
    fn push(&self, path: &str, json: &[u8]) -> JsonDbResult<String>;

    /// Remove everything at and below `path`
    ///
    /// Returns true if anything was removed.
    fn delete(&self, path: &str) -> JsonDbResult<bool>;

    /// Check whether anything is stored at or below `path`
    fn exists(&self, path: &str) -> JsonDbResult<bool>;

    /// Paths of the documents in `collection` whose `field` equals `value`
    ///
    /// Served from a declared index when one covers the pair, otherwise
    /// by scanning the collection.
    fn fetch_ids_by_property_value(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> JsonDbResult<Vec<String>>;

    /// Generate a time-ordered unique key
    fn create_key(&self) -> String;

    /// Create the row, config and index tables (idempotent)
    fn create_tables(&self) -> JsonDbResult<()>;

    /// Drop every table created by [`JsonDb::create_tables`] (idempotent)
    fn drop_tables(&self) -> JsonDbResult<()>;
}
