//! Repository layer
//!
//! SQLite implementation of the row store trait

pub mod sqlite_rows;

pub use sqlite_rows::SqliteRowStore;
