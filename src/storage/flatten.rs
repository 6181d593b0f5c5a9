// File: src/storage/flatten.rs

//! Conversion between JSON values and path-keyed rows
//!
//! Only leaves get rows: scalars and the markers of empty containers.
//! Reconstruction walks rows sorted by path and rebuilds the tree in one
//! pass, relying on siblings being contiguous in that order.

use super::path::{self, DbPath};
use super::value;
use crate::error::{JsonDbResult, StorageError};
use crate::key;
use crate::traits::GetOptions;
use serde_json::{Map, Value};

/// One stored row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonRow {
    pub path: String,
    pub value: String,
    pub ovalue: Option<String>,
}

impl JsonRow {
    fn leaf(path: &DbPath, leaf: &Value) -> Self {
        let encoded = value::encode(leaf);
        Self {
            path: path.as_str().to_string(),
            value: encoded.value,
            ovalue: encoded.ovalue,
        }
    }
}

/// Flatten `value` into the rows stored at and below `base`
pub fn flatten(base: &DbPath, value: &Value) -> JsonDbResult<Vec<JsonRow>> {
    let mut rows = Vec::new();
    flatten_into(base, value, &mut rows)?;
    Ok(rows)
}

fn flatten_into(at: &DbPath, value: &Value, rows: &mut Vec<JsonRow>) -> JsonDbResult<()> {
    match value {
        Value::Object(members) if !members.is_empty() => {
            for (key, member) in members {
                flatten_into(&at.child(&path::key_segment(key)?), member, rows)?;
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (idx, item) in items.iter().enumerate() {
                flatten_into(&at.child(&value::array_index_segment(idx as u64)), item, rows)?;
            }
        }
        leaf => rows.push(JsonRow::leaf(at, leaf)),
    }
    Ok(())
}

enum Node {
    Leaf(Value),
    Branch(Vec<(String, Node)>),
}

/// Rebuild the document at `base` from its rows
///
/// Rows must be sorted by path, ascending or descending. `lists` names
/// the collections whose generated-key children render as an array.
pub fn reconstruct<I>(
    base: &DbPath,
    rows: I,
    options: &GetOptions,
    lists: &[DbPath],
) -> JsonDbResult<Option<Value>>
where
    I: IntoIterator<Item = JsonRow>,
{
    let mut root: Option<Node> = None;
    let mut last_child: Option<String> = None;
    let mut children = 0usize;

    for row in rows {
        let segments = base.segments_below(&row.path).ok_or_else(|| {
            StorageError::Corruption(format!("row {:?} outside {}", row.path, base.as_str()))
        })?;

        if let (Some(limit), Some(first)) = (options.limit_to_first, segments.first()) {
            if last_child.as_deref() != Some(*first) {
                children += 1;
                last_child = Some(first.to_string());
            }
            if children > limit {
                break;
            }
        }

        let (segments, leaf) = if options.depth > 0 && segments.len() > options.depth {
            (&segments[..options.depth], Value::Bool(true))
        } else {
            (
                &segments[..],
                value::decode(&row.value, row.ovalue.as_deref())?,
            )
        };

        let node = root.get_or_insert_with(|| Node::Branch(Vec::new()));
        insert(node, segments, leaf);
    }

    root.map(|node| into_value(node, base.as_str(), lists, options.depth == 0))
        .transpose()
}

fn insert(node: &mut Node, segments: &[&str], leaf: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *node = Node::Leaf(leaf);
        return;
    };

    if let Node::Leaf(_) = node {
        *node = Node::Branch(Vec::new());
    }
    if let Node::Branch(children) = node {
        let same = matches!(children.last(), Some((seg, _)) if seg == first);
        if !same {
            children.push((first.to_string(), Node::Branch(Vec::new())));
        }
        if let Some((_, child)) = children.last_mut() {
            insert(child, rest, leaf);
        }
    }
}

fn into_value(node: Node, at: &str, lists: &[DbPath], list_shapes: bool) -> JsonDbResult<Value> {
    let children = match node {
        Node::Leaf(leaf) => return Ok(leaf),
        Node::Branch(children) => children,
    };

    if !children.is_empty() && children.iter().all(|(seg, _)| value::is_array_index(seg)) {
        return into_array(children, at, lists, list_shapes);
    }

    let is_list = list_shapes
        && lists.iter().any(|list| list.as_str() == at)
        && children.iter().all(|(seg, _)| key::is_key(seg));
    if is_list {
        let items = children
            .into_iter()
            .map(|(seg, child)| into_value(child, &format!("{at}{seg}/"), lists, list_shapes))
            .collect::<JsonDbResult<Vec<_>>>()?;
        return Ok(Value::Array(items));
    }

    let mut members = Map::with_capacity(children.len());
    for (seg, child) in children {
        let child_at = format!("{at}{seg}/");
        let key = path::unescape(&seg)
            .map_err(|_| StorageError::Corruption(format!("bad stored segment {seg:?}")))?;
        members.insert(key, into_value(child, &child_at, lists, list_shapes)?);
    }
    Ok(Value::Object(members))
}

fn into_array(
    children: Vec<(String, Node)>,
    at: &str,
    lists: &[DbPath],
    list_shapes: bool,
) -> JsonDbResult<Value> {
    let mut indexed = Vec::with_capacity(children.len());
    for (seg, child) in children {
        let idx = value::parse_array_index(&seg)
            .ok_or_else(|| StorageError::Corruption(format!("bad array index {seg:?}")))?;
        let child_at = format!("{at}{seg}/");
        indexed.push((idx, into_value(child, &child_at, lists, list_shapes)?));
    }
    indexed.sort_by_key(|(idx, _)| *idx);

    let mut items = Vec::with_capacity(indexed.len());
    for (idx, item) in indexed {
        while (items.len() as u64) < idx {
            items.push(Value::Null);
        }
        items.push(item);
    }
    Ok(Value::Array(items))
}
