// File: src/storage/sqlite/documents.rs

//! Write operations: set, update, create, push and delete
//!
//! Every write removes the rows stored exactly at the ancestors of the
//! written path, so a path is never both a leaf and an inner node. A write
//! that addresses a container through the other kind of segment (a key
//! inside an array or an index inside an object) replaces that container.

use super::deadline::Deadline;
use super::store::SqlJsonDb;
use crate::error::{is_constraint_violation, JsonDbError, JsonDbResult};
use crate::storage::events::ChangeEvent;
use crate::storage::flatten::{self, JsonRow};
use crate::storage::path::{self, DbPath};
use crate::storage::{query, value};
use rusqlite::{params, Connection, TransactionBehavior};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

/// Bookkeeping shared by the steps of one write transaction
#[derive(Default)]
struct WriteState {
    /// Ancestors whose leaf rows were already cleared
    cleared: HashSet<DbPath>,

    /// Containers dropped because the write changed their shape
    reshaped: Vec<DbPath>,

    removed: usize,
}

impl SqlJsonDb {
    /// Replace the subtree at `path`
    pub(crate) fn set_impl(&self, path: &str, json: &[u8], deadline: Deadline) -> JsonDbResult<()> {
        let base = path::normalize(path)?;
        let value: Value = serde_json::from_slice(json)?;
        self.set_at(&base, &value, "set", deadline)
    }

    fn set_at(
        &self,
        base: &DbPath,
        value: &Value,
        operation: &'static str,
        deadline: Deadline,
    ) -> JsonDbResult<()> {
        let rows = flatten::flatten(base, value)?;

        let (removed, reindexed) =
            self.transact(deadline, operation, TransactionBehavior::Immediate, |tx| {
                let mut state = WriteState::default();
                state.removed += delete_subtree(tx, base)?;
                prepare_parents(tx, base, &mut state)?;
                insert_rows(tx, &rows)?;
                deadline.check(operation)?;
                let reindexed = refresh_indexes(self, tx, base, &state)?;
                Ok((state.removed, reindexed))
            })?;

        debug!(
            path = %base,
            removed,
            inserted = rows.len(),
            reindexed,
            "{operation} committed"
        );
        self.notify(ChangeEvent::Updated, base);
        Ok(())
    }

    /// Deep-merge an object payload into the existing document at `path`
    ///
    /// Top-level member names made of digits address array elements.
    pub(crate) fn update_impl(
        &self,
        path: &str,
        json: &[u8],
        deadline: Deadline,
    ) -> JsonDbResult<()> {
        let base = path::normalize(path)?;
        let members = match serde_json::from_slice::<Value>(json)? {
            Value::Object(members) => members,
            other => {
                return Err(JsonDbError::InvalidJson(format!(
                    "update payload must be a JSON object, got {}",
                    kind(&other)
                )))
            }
        };
        let touched = members
            .keys()
            .map(|name| -> JsonDbResult<DbPath> { Ok(base.child(&path::member_segment(name)?)) })
            .collect::<JsonDbResult<Vec<_>>>()?;

        let written = self.transact(deadline, "update", TransactionBehavior::Immediate, |tx| {
            if !query::exists(tx, &base)? {
                return Err(JsonDbError::NotFound(base.display().to_string()));
            }

            let mut state = WriteState::default();
            let written = merge_object(tx, &base, &members, path::member_segment, &mut state)?;
            deadline.check("update")?;

            for member in &touched {
                refresh_indexes(self, tx, member, &state)?;
            }
            Ok(written)
        })?;

        debug!(path = %base, written, members = members.len(), "update committed");
        for member in &touched {
            self.notify(ChangeEvent::Updated, member);
        }
        Ok(())
    }

    /// Write `json` at `path` only if nothing is stored there
    pub(crate) fn create_impl(
        &self,
        path: &str,
        json: &[u8],
        deadline: Deadline,
    ) -> JsonDbResult<()> {
        let base = path::normalize(path)?;
        let value: Value = serde_json::from_slice(json)?;
        let rows = flatten::flatten(&base, &value)?;

        self.transact(deadline, "create", TransactionBehavior::Immediate, |tx| {
            if query::exists(tx, &base)? {
                return Err(JsonDbError::Conflict(format!(
                    "{} already exists",
                    base.display()
                )));
            }
            let mut state = WriteState::default();
            prepare_parents(tx, &base, &mut state)?;
            insert_rows(tx, &rows).map_err(|e| {
                if is_constraint_violation(&e) {
                    JsonDbError::Conflict(format!("{} already exists", base.display()))
                } else {
                    e.into()
                }
            })?;
            deadline.check("create")?;
            refresh_indexes(self, tx, &base, &state)?;
            Ok(())
        })?;

        debug!(path = %base, inserted = rows.len(), "create committed");
        self.notify(ChangeEvent::Updated, &base);
        Ok(())
    }

    /// Store `json` under a new generated key below `path`
    pub(crate) fn push_impl(
        &self,
        path: &str,
        json: &[u8],
        deadline: Deadline,
    ) -> JsonDbResult<String> {
        let parent = path::normalize(path)?;
        let value: Value = serde_json::from_slice(json)?;
        let key = self.keys.next_key();
        self.set_at(&parent.child(&key), &value, "push", deadline)?;
        Ok(key)
    }

    /// Remove the subtree at `path`
    pub(crate) fn delete_impl(&self, path: &str, deadline: Deadline) -> JsonDbResult<bool> {
        let base = path::normalize(path)?;

        let removed = self.transact(deadline, "delete", TransactionBehavior::Immediate, |tx| {
            let removed = delete_subtree(tx, &base)?;
            if removed > 0 {
                deadline.check("delete")?;
                self.indexes.refresh(tx, &base)?;
            }
            Ok(removed)
        })?;

        debug!(path = %base, removed, "delete committed");
        if removed > 0 {
            self.notify(ChangeEvent::Deleted, &base);
        }
        Ok(removed > 0)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Refresh the indexes for `written` and for every reshaped container
fn refresh_indexes(
    db: &SqlJsonDb,
    conn: &Connection,
    written: &DbPath,
    state: &WriteState,
) -> JsonDbResult<usize> {
    let mut reindexed = db.indexes.refresh(conn, written)?;
    for container in &state.reshaped {
        reindexed += db.indexes.refresh(conn, container)?;
    }
    Ok(reindexed)
}

/// Merge `members` into the object at `at`, returning rows written
///
/// `segment` maps member names of this level; deeper levels always use
/// literal keys.
fn merge_object(
    conn: &Connection,
    at: &DbPath,
    members: &Map<String, Value>,
    segment: fn(&str) -> JsonDbResult<String>,
    state: &mut WriteState,
) -> JsonDbResult<usize> {
    let mut written = 0;
    for (name, member) in members {
        let child = at.child(&segment(name)?);
        written += match member {
            Value::Object(inner) if !inner.is_empty() => {
                merge_object(conn, &child, inner, path::key_segment, state)?
            }
            // an empty object never hides existing content
            Value::Object(_) => {
                if query::exists(conn, &child)? {
                    0
                } else {
                    replace_subtree(conn, &child, member, state)?
                }
            }
            _ => replace_subtree(conn, &child, member, state)?,
        };
    }
    Ok(written)
}

fn replace_subtree(
    conn: &Connection,
    at: &DbPath,
    value: &Value,
    state: &mut WriteState,
) -> JsonDbResult<usize> {
    let rows = flatten::flatten(at, value)?;
    state.removed += delete_subtree(conn, at)?;
    prepare_parents(conn, at, state)?;
    insert_rows(conn, &rows)?;
    Ok(rows.len())
}

/// Make every ancestor of `path` a container of the kind `path` needs
fn prepare_parents(conn: &Connection, path: &DbPath, state: &mut WriteState) -> JsonDbResult<()> {
    if let Some((container, removed)) = clear_shape_conflict(conn, path)? {
        state.removed += removed;
        state.reshaped.push(container);
    }
    state.removed += clear_ancestors(conn, path, &mut state.cleared)?;
    Ok(())
}

/// Delete the outermost ancestor of `path` whose stored children are of the
/// other segment kind than the one `path` continues with
///
/// An array holds only index segments and an object only key segments.
fn clear_shape_conflict(conn: &Connection, path: &DbPath) -> JsonDbResult<Option<(DbPath, usize)>> {
    let mut at = DbPath::root();
    for segment in path.segments() {
        let conflict = if value::is_array_index(segment) {
            query::has_key_children(conn, &at)?
        } else {
            query::has_index_children(conn, &at)?
        };
        if conflict {
            // everything below `at` goes with it
            let removed = delete_subtree(conn, &at)?;
            return Ok(Some((at, removed)));
        }
        at = at.child(segment);
    }
    Ok(None)
}

/// Delete every row at and below `base`
fn delete_subtree(conn: &Connection, base: &DbPath) -> JsonDbResult<usize> {
    let removed = conn
        .prepare_cached("DELETE FROM jsondb WHERE path >= ?1 AND path < ?2")?
        .execute(params![base.as_str(), base.upper_bound()])?;
    Ok(removed)
}

/// Delete leaf rows stored exactly at ancestors of `path`
///
/// `cleared` remembers ancestors already handled in this transaction.
fn clear_ancestors(
    conn: &Connection,
    path: &DbPath,
    cleared: &mut HashSet<DbPath>,
) -> JsonDbResult<usize> {
    let mut stmt = conn.prepare_cached("DELETE FROM jsondb WHERE path = ?1")?;
    let mut removed = 0;
    for ancestor in path.ancestors() {
        if cleared.insert(ancestor.clone()) {
            removed += stmt.execute(params![ancestor.as_str()])?;
        }
    }
    Ok(removed)
}

fn insert_rows(conn: &Connection, rows: &[JsonRow]) -> rusqlite::Result<()> {
    let mut stmt =
        conn.prepare_cached("INSERT INTO jsondb (path, value, ovalue) VALUES (?1, ?2, ?3)")?;
    for row in rows {
        stmt.execute(params![row.path, row.value, row.ovalue])?;
    }
    Ok(())
}
