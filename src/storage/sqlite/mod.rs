// File: src/storage/sqlite/mod.rs

mod config;
mod deadline;
mod documents;
mod reads;
mod schema;
mod store;

// Public exports
pub use config::{SqliteConfig, StorageStats};
pub use schema::SCHEMA_VERSION;
pub use store::{Bounded, SqlJsonDb};
