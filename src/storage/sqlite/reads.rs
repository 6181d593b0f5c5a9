// File: src/storage/sqlite/reads.rs

use super::deadline::Deadline;
use super::store::SqlJsonDb;
use crate::error::{JsonDbError, JsonDbResult};
use crate::storage::flatten;
use crate::storage::path;
use crate::storage::query;
use crate::storage::value;
use crate::traits::GetOptions;
use rusqlite::TransactionBehavior;
use std::collections::BTreeSet;
use tracing::warn;

impl SqlJsonDb {
    /// Read and render the document at `path`
    pub(crate) fn get_impl(
        &self,
        path: &str,
        options: &GetOptions,
        deadline: Deadline,
    ) -> JsonDbResult<Option<Vec<u8>>> {
        let base = path::normalize(path)?;
        if let Some(callback) = &options.callback {
            validate_callback(callback)?;
        }

        let rows = self.transact(deadline, "get", TransactionBehavior::Deferred, |tx| {
            query::subtree(tx, &base, options)
        })?;
        let Some(document) = flatten::reconstruct(&base, rows, options, &self.lists)? else {
            return Ok(None);
        };

        let mut out = Vec::new();
        if let Some(callback) = &options.callback {
            out.extend_from_slice(callback.as_bytes());
            out.push(b'(');
        }
        if options.pretty_print {
            serde_json::to_writer_pretty(&mut out, &document)?;
        } else {
            serde_json::to_writer(&mut out, &document)?;
        }
        if options.callback.is_some() {
            out.push(b')');
        }
        Ok(Some(out))
    }

    pub(crate) fn exists_impl(&self, path: &str, deadline: Deadline) -> JsonDbResult<bool> {
        let base = path::normalize(path)?;
        self.transact(deadline, "exists", TransactionBehavior::Deferred, |tx| {
            query::exists(tx, &base)
        })
    }

    /// Documents of `collection` whose `field` holds the string `value`
    pub(crate) fn fetch_ids_impl(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        deadline: Deadline,
    ) -> JsonDbResult<Vec<String>> {
        let collection = path::normalize(collection)?;
        let field = path::normalize(field)?;
        if field.is_root() {
            return Err(JsonDbError::invalid_path("", "empty field path"));
        }
        let encoded = value::string_value(value);

        let operation = "fetch_ids_by_property_value";
        self.transact(deadline, operation, TransactionBehavior::Deferred, |tx| {
            if let Some(def) = self.indexes.find(&collection, &field) {
                return self.indexes.lookup(tx, def, &encoded);
            }

            warn!(
                collection = %collection,
                field = %field,
                "no index declared, scanning collection"
            );
            let docs: BTreeSet<String> = query::scan_field(tx, &collection, &field)?
                .into_iter()
                .filter(|(_, stored)| *stored == encoded)
                .map(|(doc, _)| doc.display().to_string())
                .collect();
            Ok(docs.into_iter().collect())
        })
    }
}

/// JSONP callbacks are limited to identifier characters
fn validate_callback(callback: &str) -> JsonDbResult<()> {
    let mut chars = callback.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.')) {
        Ok(())
    } else {
        Err(JsonDbError::InvalidJson(format!(
            "invalid callback name {callback:?}"
        )))
    }
}
