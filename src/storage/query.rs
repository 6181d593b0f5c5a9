// File: src/storage/query.rs

//! Range scans over the row table
//!
//! A subtree is always selected as the half-open key range
//! `[base, upper(base))`; child-key bounds from [`GetOptions`] narrow that
//! range further. No `LIKE` patterns are involved, so `%` and `_` inside
//! keys need no special handling.

use super::flatten::JsonRow;
use super::path::{self, DbPath};
use crate::error::JsonDbResult;
use crate::traits::GetOptions;
use rusqlite::{params, Connection, OptionalExtension, Row};

fn row_to_json_row(row: &Row) -> rusqlite::Result<JsonRow> {
    Ok(JsonRow {
        path: row.get(0)?,
        value: row.get(1)?,
        ovalue: row.get(2)?,
    })
}

/// Extra `(operator, bound)` pairs for the child-key options
///
/// Children are ordered by their `key/` path prefix, so every bound is
/// expressed against that form.
fn child_bounds(base: &DbPath, options: &GetOptions) -> Vec<(&'static str, String)> {
    let key = |k: &str| format!("{}{}", base.as_str(), path::escape(k));
    let mut bounds = Vec::new();
    if let Some(k) = &options.start_at {
        bounds.push((">=", format!("{}/", key(k))));
    }
    if let Some(k) = &options.start_after {
        bounds.push((">=", format!("{}0", key(k))));
    }
    if let Some(k) = &options.end_at {
        bounds.push(("<", format!("{}0", key(k))));
    }
    if let Some(k) = &options.end_before {
        bounds.push(("<", format!("{}/", key(k))));
    }
    bounds
}

/// All rows of the subtree at `base` that fall inside the option bounds
pub fn subtree(conn: &Connection, base: &DbPath, options: &GetOptions) -> JsonDbResult<Vec<JsonRow>> {
    let mut sql =
        String::from("SELECT path, value, ovalue FROM jsondb WHERE path >= ?1 AND path < ?2");
    let mut bind = vec![base.as_str().to_string(), base.upper_bound()];
    for (op, bound) in child_bounds(base, options) {
        bind.push(bound);
        sql.push_str(&format!(" AND path {op} ?{}", bind.len()));
    }
    sql.push_str(" ORDER BY path ");
    sql.push_str(options.order.as_sql());

    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(bind.iter()), row_to_json_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Number of rows at and below `base`
pub fn count(conn: &Connection, base: &DbPath) -> JsonDbResult<u64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM jsondb WHERE path >= ?1 AND path < ?2",
        params![base.as_str(), base.upper_bound()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// True if at least one row is stored at or below `base`
pub fn exists(conn: &Connection, base: &DbPath) -> JsonDbResult<bool> {
    let found = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM jsondb WHERE path >= ?1 AND path < ?2)",
        params![base.as_str(), base.upper_bound()],
        |row| row.get(0),
    )?;
    Ok(found)
}

/// True if `base` has a child stored under an array-index segment
pub fn has_index_children(conn: &Connection, base: &DbPath) -> JsonDbResult<bool> {
    let (low, high) = base.index_children_range();
    let found = conn
        .prepare_cached("SELECT EXISTS(SELECT 1 FROM jsondb WHERE path >= ?1 AND path < ?2)")?
        .query_row(params![low, high], |row| row.get(0))?;
    Ok(found)
}

/// True if `base` has a child stored under an object-key segment
pub fn has_key_children(conn: &Connection, base: &DbPath) -> JsonDbResult<bool> {
    let (low, high) = base.index_children_range();
    let found = conn
        .prepare_cached(
            "SELECT EXISTS(SELECT 1 FROM jsondb WHERE path > ?1 AND path < ?2 \
             AND NOT (path >= ?3 AND path < ?4))",
        )?
        .query_row(
            params![base.as_str(), base.upper_bound(), low, high],
            |row| row.get(0),
        )?;
    Ok(found)
}

/// The row stored exactly at `path`
pub fn row_at(conn: &Connection, path: &DbPath) -> JsonDbResult<Option<JsonRow>> {
    let row = conn
        .query_row(
            "SELECT path, value, ovalue FROM jsondb WHERE path = ?1",
            params![path.as_str()],
            row_to_json_row,
        )
        .optional()?;
    Ok(row)
}

/// `(document, value)` for every document of `collection` whose `field`
/// leaf exists, in document order
pub fn scan_field(
    conn: &Connection,
    collection: &DbPath,
    field: &DbPath,
) -> JsonDbResult<Vec<(DbPath, String)>> {
    let field_segments: Vec<&str> = field.segments().collect();
    let mut stmt = conn.prepare_cached(
        "SELECT path, value FROM jsondb WHERE path >= ?1 AND path < ?2 ORDER BY path",
    )?;
    let mut rows = stmt.query(params![collection.as_str(), collection.upper_bound()])?;

    let mut found = Vec::new();
    while let Some(row) = rows.next()? {
        let row_path: String = row.get(0)?;
        let Some(segments) = collection.segments_below(&row_path) else {
            continue;
        };
        if let Some((doc, rest)) = segments.split_first() {
            if rest == field_segments.as_slice() {
                found.push((collection.child(doc), row.get(1)?));
            }
        }
    }
    Ok(found)
}
