//! Commanded States Store - persistence backends for the state tables
//!
//! Provides:
//! - SQLite row store with an embedded migrations framework
//! - JSON-lines archive store, written with temp-and-rename
//!
//! Both implement the store traits from `cmdstates-core`, so the reconciler
//! never sees which backend it is talking to.

pub mod archive;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

// Re-export key types
pub use archive::JsonlArchive;
pub use errors::Result;
pub use repo::SqliteRowStore;
