// File: src/storage/path.rs

//! Path normalization and segment escaping
//!
//! Every stored row is keyed by a [`DbPath`]: escaped segments joined by `/`
//! with both a leading and a trailing slash (`/connections/:5/name/`). The
//! trailing slash keeps subtree ranges collision free: `/a/b/` is never a
//! prefix of `/a/bc/`.
//!
//! Segment rules:
//! - reserved characters (`. % $ # [ ] /` and ASCII controls) are written as
//!   `%XX` escapes
//! - a segment made only of digits addresses an array element and is
//!   rewritten to the sortable array-index form (see [`super::value`])
//! - a segment starting with `:` is an opaque document id

use super::value;
use crate::error::{JsonDbError, JsonDbResult};
use std::fmt::{self, Write as _};

/// Longest accepted segment, in characters
pub const MAX_SEGMENT_LEN: usize = 768;

/// Largest array index addressable through a path
pub const MAX_ARRAY_INDEX: u64 = 1_000_000;

fn is_reserved(c: char) -> bool {
    matches!(c, '.' | '%' | '$' | '#' | '[' | ']' | '/') || (c as u32) < 32 || c as u32 == 127
}

/// Escape every reserved character of a raw key
pub fn escape(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        if is_reserved(c) {
            // reserved characters are all ASCII
            let _ = write!(out, "%{:02X}", c as u32);
        } else {
            out.push(c);
        }
    }
    out
}

/// Reverse [`escape`]
pub fn unescape(segment: &str) -> JsonDbResult<String> {
    if !segment.contains('%') {
        return Ok(segment.to_string());
    }

    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let decoded = bytes
                .get(i + 1..i + 3)
                .and_then(|pair| hex::decode(pair).ok())
                .ok_or_else(|| JsonDbError::invalid_path(segment, "malformed escape"))?;
            out.extend_from_slice(&decoded);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).map_err(|_| JsonDbError::invalid_path(segment, "escape is not UTF-8"))
}

/// Normalize a caller path into its storage form
pub fn normalize(path: &str) -> JsonDbResult<DbPath> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Ok(DbPath::root());
    }

    let mut out = String::with_capacity(trimmed.len() + 2);
    out.push('/');
    for raw in trimmed.split('/') {
        out.push_str(&canonical_segment(path, raw)?);
        out.push('/');
    }
    Ok(DbPath(out))
}

/// Storage form of a raw object key
pub fn key_segment(key: &str) -> JsonDbResult<String> {
    if key.is_empty() {
        return Err(JsonDbError::InvalidPath("empty object key".into()));
    }
    let escaped = escape(key);
    if escaped.chars().count() > MAX_SEGMENT_LEN {
        return Err(JsonDbError::invalid_path(key, "key too long"));
    }
    Ok(escaped)
}

/// Storage form of a top-level `update` member name
///
/// A name made only of digits addresses an array element, exactly as the
/// same segment would inside a path. Nested member names stay literal keys.
pub fn member_segment(name: &str) -> JsonDbResult<String> {
    if is_all_digits(name) {
        return index_segment(name, name);
    }
    key_segment(name)
}

fn is_all_digits(raw: &str) -> bool {
    !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit())
}

fn index_segment(path: &str, raw: &str) -> JsonDbResult<String> {
    let idx = raw
        .parse::<u64>()
        .ok()
        .filter(|idx| *idx <= MAX_ARRAY_INDEX)
        .ok_or_else(|| JsonDbError::invalid_path(path, "array index out of range"))?;
    Ok(value::array_index_segment(idx))
}

fn canonical_segment(path: &str, raw: &str) -> JsonDbResult<String> {
    if raw.is_empty() {
        return Err(JsonDbError::invalid_path(path, "empty segment"));
    }
    if raw.chars().count() > MAX_SEGMENT_LEN {
        return Err(JsonDbError::invalid_path(path, "segment too long"));
    }

    if is_all_digits(raw) {
        return index_segment(path, raw);
    }

    if let Some(c) = raw.chars().find(|&c| c != '%' && is_reserved(c)) {
        return Err(JsonDbError::invalid_path(
            path,
            format!("unescaped reserved character {c:?}"),
        ));
    }

    Ok(escape(&unescape(raw)?))
}

/// A normalized storage path, always `/`-terminated
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DbPath(String);

impl DbPath {
    pub fn root() -> Self {
        DbPath("/".to_string())
    }

    /// Wrap a path read back from the row table
    pub(crate) fn from_stored(path: String) -> Self {
        DbPath(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Caller-facing form without the trailing slash
    pub fn display(&self) -> &str {
        if self.is_root() {
            "/"
        } else {
            &self.0[..self.0.len() - 1]
        }
    }

    /// Caller-facing form with array positions written as plain numbers
    ///
    /// Normalizing the result yields this path again.
    pub fn caller_path(&self) -> String {
        if self.is_root() {
            return "/".to_string();
        }
        let mut out = String::with_capacity(self.0.len());
        for segment in self.segments() {
            out.push('/');
            match value::parse_array_index(segment) {
                Some(idx) if value::is_array_index(segment) => {
                    let _ = write!(out, "{idx}");
                }
                _ => out.push_str(segment),
            }
        }
        out
    }

    /// Append an already escaped segment
    pub fn child(&self, segment: &str) -> DbPath {
        DbPath(format!("{}{}/", self.0, segment))
    }

    /// Append a relative path (`field` is itself normalized)
    pub fn join(&self, relative: &DbPath) -> DbPath {
        DbPath(format!("{}{}", self.0, &relative.0[1..]))
    }

    /// Exclusive upper bound of this subtree's key range
    pub fn upper_bound(&self) -> String {
        // '0' is the successor of '/'
        format!("{}0", &self.0[..self.0.len() - 1])
    }

    /// Key range `[low, high)` holding the array-index children
    ///
    /// Index segments all start with `[`, which escaped keys never do.
    pub fn index_children_range(&self) -> (String, String) {
        (format!("{}[", self.0), format!("{}\\", self.0))
    }

    /// Strict ancestors, nearest first, root included
    pub fn ancestors(&self) -> Vec<DbPath> {
        let inner = &self.0[..self.0.len() - 1];
        inner
            .rmatch_indices('/')
            .map(|(pos, _)| DbPath(self.0[..=pos].to_string()))
            .collect()
    }

    pub fn starts_with(&self, other: &DbPath) -> bool {
        self.0.starts_with(&other.0)
    }

    /// Segments of `path` below this one, or `None` if `path` is outside
    pub fn segments_below<'a>(&self, path: &'a str) -> Option<Vec<&'a str>> {
        let rest = path.strip_prefix(self.0.as_str())?;
        if rest.is_empty() {
            return Some(Vec::new());
        }
        Some(rest.strip_suffix('/')?.split('/').collect())
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }
}

impl fmt::Display for DbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}
