//! Common test utilities and fixtures
//!
//! This module provides shared test infrastructure including:
//! - Store setup, in memory or on a temporary file
//! - Sample documents
//! - Assertions over rendered documents

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;

// Re-export commonly used items
pub use assertions::*;
pub use fixtures::*;

// Re-export frequently used external types for convenience
pub use jsondb::{GetOptions, JsonDb, SqlJsonDb};
pub use serde_json::{json, Value};
pub use std::sync::Arc;
