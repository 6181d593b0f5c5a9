//! JsonDB error types

use thiserror::Error;

/// Main store error type
#[derive(Debug, Error)]
pub enum JsonDbError {
    // ========== Caller Errors ==========
    /// Malformed path, key or segment
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Payload is not valid JSON or has the wrong shape
    #[error("invalid json: {0}")]
    InvalidJson(String),

    /// Operation required an existing document
    #[error("not found: {0}")]
    NotFound(String),

    /// Write-if-absent lost against an existing document
    #[error("conflict: {0}")]
    Conflict(String),

    // ========== Resource Errors ==========
    /// Deadline expired, the transaction was rolled back
    #[error("{operation} timed out after {elapsed_ms}ms")]
    Timeout {
        operation: &'static str,
        elapsed_ms: u64,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    // ========== Storage Errors ==========
    /// Underlying relational failure
    #[error("backend error: {0}")]
    Backend(StorageError),
}

/// Backend-specific errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database could not be opened or the connection is unusable
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Tables have not been created yet
    #[error("storage not initialized: {0}")]
    NotInitialized(String),

    /// A stored row could not be decoded
    #[error("data corruption: {0}")]
    Corruption(String),

    /// SQLite database error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Store result type alias
pub type JsonDbResult<T> = Result<T, JsonDbError>;

impl JsonDbError {
    /// Get error code for callers that expose errors over a wire
    pub fn error_code(&self) -> &'static str {
        match self {
            JsonDbError::InvalidPath(_) => "INVALID_PATH",
            JsonDbError::InvalidJson(_) => "INVALID_JSON",
            JsonDbError::NotFound(_) => "NOT_FOUND",
            JsonDbError::Conflict(_) => "CONFLICT",
            JsonDbError::Timeout { .. } => "TIMEOUT",
            JsonDbError::Config(_) => "CONFIG_ERROR",
            JsonDbError::Backend(_) => "BACKEND_ERROR",
        }
    }

    /// Check if the caller may retry the operation
    ///
    /// The store itself never retries. Only `set`, `delete` and `get` are
    /// safe to repeat; retrying `update` or `push` may double-apply.
    pub fn is_retryable(&self) -> bool {
        match self {
            JsonDbError::Timeout { .. } => true,
            JsonDbError::Backend(StorageError::ConnectionFailed(_)) => true,
            JsonDbError::Backend(StorageError::Sqlite(e)) => is_busy(e),
            _ => false,
        }
    }

    pub(crate) fn invalid_path(path: &str, reason: impl std::fmt::Display) -> Self {
        JsonDbError::InvalidPath(format!("{reason}: {path:?}"))
    }
}

fn is_busy(e: &rusqlite::Error) -> bool {
    matches!(
        e.sqlite_error_code(),
        Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked)
    )
}

/// True for primary key / unique constraint violations
pub(crate) fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e.sqlite_error_code(),
        Some(rusqlite::ErrorCode::ConstraintViolation)
    )
}

// Conversions from external errors

impl From<serde_json::Error> for JsonDbError {
    fn from(e: serde_json::Error) -> Self {
        JsonDbError::InvalidJson(e.to_string())
    }
}

impl From<rusqlite::Error> for JsonDbError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(_, Some(msg)) = &e {
            if msg.starts_with("no such table") {
                return JsonDbError::Backend(StorageError::NotInitialized(msg.clone()));
            }
        }
        JsonDbError::Backend(StorageError::Sqlite(e))
    }
}

impl From<StorageError> for JsonDbError {
    fn from(e: StorageError) -> Self {
        JsonDbError::Backend(e)
    }
}
