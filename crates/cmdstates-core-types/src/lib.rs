//! Core types shared across the commanded-states crates
//!
//! - **Correlation types**: RunId tagging a single interpret-and-reconcile run
//! - **Schema constants**: Canonical field keys and event names for logging

pub mod correlation;
pub mod schema;

pub use correlation::RunId;
