//! Persistence backend interfaces
//!
//! Both stores hold the same row schema ([`State`]) keyed by `datestart`.
//! Backends report failures as [`ExError`]; the reconciler lifts them into
//! `StatesError::Persistence`.

#![allow(clippy::result_large_err)]

pub mod memory;

pub use memory::{MemoryArchive, MemoryRowStore};

use crate::errors::ExError;
use crate::model::State;

/// Row-oriented store supporting range queries, deletes and inserts
pub trait RowStore {
    /// Rows with `datestop > start` and `datestart < stop`, ordered by
    /// `datestart`.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn fetch_overlapping(&self, start: &str, stop: &str) -> Result<Vec<State>, ExError>;

    /// Every row, ordered by `datestart`.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn fetch_all(&self) -> Result<Vec<State>, ExError>;

    /// The last `n` rows in `datestart` order.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn tail(&self, n: usize) -> Result<Vec<State>, ExError>;

    /// Latest row with `datestop < date` in the given pointing mode.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn last_state_before(&self, date: &str, pcad_mode: &str) -> Result<Option<State>, ExError>;

    /// Number of rows.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn count(&self) -> Result<usize, ExError>;

    /// Delete rows with `datestart >= datestart`, returning how many went.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn delete_from(&mut self, datestart: &str) -> Result<usize, ExError>;

    /// Insert rows; `datestart` must not collide with an existing row.
    ///
    /// # Errors
    ///
    /// Backend failure, including a duplicate `datestart`.
    fn insert(&mut self, states: &[State]) -> Result<(), ExError>;
}

/// Append-only ordered archive
///
/// Rows are addressed by position. Only a contiguous block at the end can be
/// removed.
pub trait ArchiveStore {
    /// Whether the archive has ever been created.
    fn is_initialized(&self) -> bool;

    /// Create the archive holding `states`, replacing anything present.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn create(&mut self, states: &[State]) -> Result<(), ExError>;

    /// Number of rows.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn len(&self) -> Result<usize, ExError>;

    /// Whether the archive holds no rows.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn is_empty(&self) -> Result<bool, ExError> {
        Ok(self.len()? == 0)
    }

    /// Positions of rows with `datestart >= datestart`, ascending.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn indices_from(&self, datestart: &str) -> Result<Vec<usize>, ExError>;

    /// Positions of rows with `datestop > start` and `datestart < stop`.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn indices_overlapping(&self, start: &str, stop: &str) -> Result<Vec<usize>, ExError>;

    /// Rows at positions `start..stop`.
    ///
    /// # Errors
    ///
    /// Backend failure or a range past the end.
    fn read_range(&self, start: usize, stop: usize) -> Result<Vec<State>, ExError>;

    /// Append rows in order.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn append(&mut self, states: &[State]) -> Result<(), ExError>;

    /// Remove rows at positions `start..stop`.
    ///
    /// # Errors
    ///
    /// Backend failure or a range that is not a suffix.
    fn remove_rows(&mut self, start: usize, stop: usize) -> Result<(), ExError>;
}
