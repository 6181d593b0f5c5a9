//! jsondb library exports
//!
//! A path-addressable JSON document store persisted as flattened rows in
//! SQLite.

pub mod config;
pub mod error;
pub mod key;
pub mod storage;
pub mod traits;

// Re-exports
pub use config::Config;
pub use error::{JsonDbError, JsonDbResult, StorageError};
pub use key::KeyGenerator;
pub use storage::{
    Bounded, ChangeEvent, ChangeListener, DbPath, Index, SqlJsonDb, SqliteConfig, StorageStats,
    SCHEMA_VERSION,
};
pub use traits::{plan_operators, GetOptions, JsonDb, ListOperator, ListPlan, Order};
