//! Trait definitions for the store and its read options

pub mod options;
pub mod store;

pub use options::{plan_operators, GetOptions, ListOperator, ListPlan, Order};
pub use store::JsonDb;
