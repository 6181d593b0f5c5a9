// File: src/storage/sqlite/deadline.rs

use crate::error::{JsonDbError, JsonDbResult};
use std::time::{Duration, Instant};

/// Time budget of one store operation
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn after(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    /// Time left, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.limit
            .map(|limit| limit.saturating_sub(self.started.elapsed()))
    }

    pub fn check(&self, operation: &'static str) -> JsonDbResult<()> {
        match self.remaining() {
            Some(left) if left.is_zero() => Err(self.expired(operation)),
            _ => Ok(()),
        }
    }

    pub fn expired(&self, operation: &'static str) -> JsonDbError {
        JsonDbError::Timeout {
            operation,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}
