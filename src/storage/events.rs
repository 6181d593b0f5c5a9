// File: src/storage/events.rs

//! Change notifications delivered after a write commits

use std::fmt;
use std::sync::Arc;

/// Kind of committed change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeEvent {
    /// A subtree was written by set, create, push or an update member
    Updated,
    /// A subtree was removed
    Deleted,
}

impl ChangeEvent {
    /// Event name as broadcast to listeners
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeEvent::Updated => "jsondb-updated",
            ChangeEvent::Deleted => "jsondb-deleted",
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback receiving every committed change with the caller-facing path
///
/// Runs on the writing thread after the transaction has committed and the
/// connection has been released.
pub type ChangeListener = Arc<dyn Fn(ChangeEvent, &str) + Send + Sync>;
