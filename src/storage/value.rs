// File: src/storage/value.rs

//! Type-tagged scalar encoding
//!
//! Each leaf row stores its JSON value in a text column whose first
//! character is a type tag. Numbers additionally keep their original
//! textual form in `ovalue` so they read back unchanged; the `value`
//! column holds a lexicographically sortable rendering instead.
//!
//! The same sortable rendering is used for array-index path segments, so
//! `[2` sorts before `[[210` just as 2 sorts before 10.

use crate::error::{JsonDbResult, StorageError};
use serde_json::{Map, Number, Value};

pub const NULL: char = '\u{1}';
pub const FALSE: char = '\u{2}';
pub const TRUE: char = '\u{3}';
pub const EMPTY_OBJECT: char = '\u{4}';
pub const EMPTY_ARRAY: char = '\u{5}';
pub const NUMBER: char = '[';
pub const NEG_NUMBER: char = '-';
pub const STRING: char = '`';

/// Encoded leaf: the tagged `value` column and the optional `ovalue`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub value: String,
    pub ovalue: Option<String>,
}

/// Encode a leaf value
///
/// Non-empty containers are never leaves; they encode as their empty
/// marker here and callers are expected to flatten them first.
pub fn encode(value: &Value) -> Encoded {
    let tagged = |tag: char| Encoded {
        value: tag.to_string(),
        ovalue: None,
    };
    match value {
        Value::Null => tagged(NULL),
        Value::Bool(false) => tagged(FALSE),
        Value::Bool(true) => tagged(TRUE),
        Value::Object(_) => tagged(EMPTY_OBJECT),
        Value::Array(_) => tagged(EMPTY_ARRAY),
        Value::String(s) => Encoded {
            value: string_value(s),
            ovalue: None,
        },
        Value::Number(n) => {
            // the token text exactly as parsed
            let original = n.to_string();
            Encoded {
                value: lex_sortable(&plain_decimal(&original)),
                ovalue: Some(original),
            }
        }
    }
}

/// Tagged form of a string, as stored and as matched by index lookups
pub fn string_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 1);
    out.push(STRING);
    out.push_str(s);
    out
}

/// Decode a stored leaf
pub fn decode(value: &str, ovalue: Option<&str>) -> JsonDbResult<Value> {
    let mut chars = value.chars();
    let decoded = match chars.next() {
        Some(NULL) => Value::Null,
        Some(FALSE) => Value::Bool(false),
        Some(TRUE) => Value::Bool(true),
        Some(EMPTY_OBJECT) => Value::Object(Map::new()),
        Some(EMPTY_ARRAY) => Value::Array(Vec::new()),
        Some(STRING) => Value::String(chars.as_str().to_string()),
        Some(NUMBER) | Some(NEG_NUMBER) => {
            let original = ovalue.ok_or_else(|| {
                StorageError::Corruption(format!("number without original text: {value:?}"))
            })?;
            let number: Number = serde_json::from_str(original).map_err(|_| {
                StorageError::Corruption(format!("unparseable stored number: {original:?}"))
            })?;
            Value::Number(number)
        }
        _ => {
            return Err(StorageError::Corruption(format!("unknown value tag in {value:?}")).into())
        }
    };
    Ok(decoded)
}

/// True for tagged scalars (the values an index records)
pub fn is_scalar(value: &str) -> bool {
    !matches!(value.chars().next(), Some(EMPTY_OBJECT) | Some(EMPTY_ARRAY) | None)
}

/// Sortable path segment for an array position
pub fn array_index_segment(idx: u64) -> String {
    lex_sortable(&idx.to_string())
}

pub fn is_array_index(segment: &str) -> bool {
    segment.starts_with(NUMBER)
}

/// Parse an array-index segment back to its position
pub fn parse_array_index(segment: &str) -> Option<u64> {
    let mut rest = segment.strip_prefix(NUMBER)?;
    rest = rest.trim_start_matches(NUMBER);
    let mut width = 1usize;
    let mut parsed = 0u64;
    while !rest.is_empty() {
        if width > rest.len() || !rest.is_char_boundary(width) {
            return None;
        }
        let (chunk, tail) = rest.split_at(width);
        parsed = chunk.parse().ok()?;
        width = usize::try_from(parsed).ok()?;
        rest = tail;
    }
    Some(parsed)
}

/// Render a decimal number string so that string order matches numeric order
///
/// The integer part is preceded by its length, that length by its own
/// length and so on down to one digit; one tag character is emitted per
/// level. Negative numbers use the `-` tag, complement every digit and end
/// with a `[` terminator.
pub fn lex_sortable(number: &str) -> String {
    let (tag, digits) = match number.strip_prefix('-') {
        Some(rest) => (NEG_NUMBER, rest),
        None => (NUMBER, number),
    };
    let (integer, fraction) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let mut lengths = vec![integer.to_string()];
    while let Some(last) = lengths.last().filter(|l| l.len() > 1) {
        let next = last.len().to_string();
        lengths.push(next);
    }

    let mut out = String::with_capacity(number.len() + lengths.len() * 2 + 1);
    out.extend(std::iter::repeat(tag).take(lengths.len()));
    for part in lengths.iter().rev() {
        out.push_str(part);
    }
    if let Some(fraction) = fraction {
        out.push_str(fraction);
    }

    if tag == NEG_NUMBER {
        out = out
            .chars()
            .map(|c| match c.to_digit(10) {
                Some(d) => char::from(b'9' - d as u8),
                None => c,
            })
            .collect();
        // complemented digits invert prefix order, so close every negative
        // with a character above '9'
        out.push(NUMBER);
    }
    out
}

/// Exponents beyond this are clamped before expansion
const MAX_EXPONENT: i64 = 1000;

/// Plain decimal text of a JSON number token, for sortable encoding
///
/// Exponents are expanded, leading integer zeros and trailing fraction
/// zeros dropped, so `1.10`, `1.1` and `11e-1` render alike.
fn plain_decimal(token: &str) -> String {
    let (negative, unsigned) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let (mantissa, exponent) = match unsigned.find(|c| c == 'e' || c == 'E') {
        Some(pos) => {
            let raw = &unsigned[pos + 1..];
            let exponent = raw.parse::<i64>().unwrap_or(if raw.starts_with('-') {
                -MAX_EXPONENT
            } else {
                MAX_EXPONENT
            });
            (&unsigned[..pos], exponent.clamp(-MAX_EXPONENT, MAX_EXPONENT))
        }
        None => (unsigned, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let digits = format!("{int_part}{frac_part}");
    let point = int_part.len() as i64 + exponent;
    let (integer, fraction) = if point <= 0 {
        (String::new(), format!("{}{digits}", "0".repeat(point.unsigned_abs() as usize)))
    } else if point as usize >= digits.len() {
        (
            format!("{digits}{}", "0".repeat(point as usize - digits.len())),
            String::new(),
        )
    } else {
        let (i, f) = digits.split_at(point as usize);
        (i.to_string(), f.to_string())
    };

    let integer = match integer.trim_start_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };
    let fraction = fraction.trim_end_matches('0');
    if integer == "0" && fraction.is_empty() {
        return "0".to_string();
    }

    let mut out = String::with_capacity(integer.len() + fraction.len() + 2);
    if negative {
        out.push('-');
    }
    out.push_str(integer);
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out
}
