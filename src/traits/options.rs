//! Read options and list operators

use serde::{Deserialize, Serialize};

/// Ordering of children in a read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// Options for a read
///
/// `GetOptions::default()` is an unbounded, ascending, compact read.
/// Bounds are child keys relative to the read path (`":5"`, `"name"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetOptions {
    /// Maximum nesting below the read path (0 = unlimited)
    ///
    /// Containers cut off by the limit are rendered as `true`.
    pub depth: usize,

    /// Include children whose key is at or after this key
    pub start_at: Option<String>,

    /// Include children whose key is strictly after this key
    pub start_after: Option<String>,

    /// Include children whose key is at or before this key
    pub end_at: Option<String>,

    /// Include children whose key is strictly before this key
    pub end_before: Option<String>,

    /// Child ordering
    pub order: Order,

    /// Maximum number of immediate children returned
    pub limit_to_first: Option<usize>,

    /// Indent the output
    pub pretty_print: bool,

    /// Wrap the output as `callback(...)`
    pub callback: Option<String>,
}

impl GetOptions {
    /// Immediate children only, each rendered as `true` when nested
    pub fn shallow() -> Self {
        Self {
            depth: 1,
            ..Default::default()
        }
    }
}

/// A filter a caller wants applied to a listing of `T`
///
/// `IdPrefix` can be answered by the store as a key range; `Custom`
/// filters run over the decoded items afterwards.
pub enum ListOperator<T> {
    IdPrefix(String),
    Custom(Box<dyn Fn(Vec<T>) -> Vec<T> + Send + Sync>),
}

impl<T> std::fmt::Debug for ListOperator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListOperator::IdPrefix(prefix) => f.debug_tuple("IdPrefix").field(prefix).finish(),
            ListOperator::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Result of [`plan_operators`]
pub struct ListPlan<T> {
    /// Options carrying every pushed-down id prefix
    pub options: GetOptions,

    /// Filters left for the caller
    pub remaining: Vec<Box<dyn Fn(Vec<T>) -> Vec<T> + Send + Sync>>,
}

impl<T> ListPlan<T> {
    /// Run the remaining filters in order
    pub fn apply(&self, items: Vec<T>) -> Vec<T> {
        self.remaining.iter().fold(items, |items, filter| filter(items))
    }
}

/// Split operators into a key range and caller-side filters
///
/// Several prefixes intersect: the narrowest start and end win, and
/// disjoint prefixes produce an empty range.
pub fn plan_operators<T>(operators: Vec<ListOperator<T>>) -> ListPlan<T> {
    let mut options = GetOptions::default();
    let mut remaining = Vec::new();

    for operator in operators {
        match operator {
            ListOperator::IdPrefix(prefix) => {
                let start = format!(":{prefix}");
                let end = format!(":{prefix}{}", char::MAX);
                if options.start_at.as_ref().map_or(true, |s| start > *s) {
                    options.start_at = Some(start);
                }
                if options.end_at.as_ref().map_or(true, |e| end < *e) {
                    options.end_at = Some(end);
                }
            }
            ListOperator::Custom(filter) => remaining.push(filter),
        }
    }

    ListPlan { options, remaining }
}
