//! Storage module
//!
//! Flattens JSON documents into path-keyed rows and serves them back from
//! SQLite. Leaves first: `path` and `value` encode keys and scalars,
//! `flatten` maps documents to rows, `query` and `index` run the SQL, and
//! `sqlite` ties them into the [`SqlJsonDb`] store.

pub mod events;
pub mod flatten;
pub mod index;
pub mod path;
pub mod query;
pub mod sqlite;
pub mod value;

// Re-export the store trait
pub use crate::traits::JsonDb;

// Re-export main storage types
pub use events::{ChangeEvent, ChangeListener};
pub use index::{Index, IndexManager};
pub use path::DbPath;
pub use sqlite::{Bounded, SqlJsonDb, SqliteConfig, StorageStats, SCHEMA_VERSION};
