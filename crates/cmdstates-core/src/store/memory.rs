//! In-memory backends for tests and dry runs

use super::{ArchiveStore, RowStore};
use crate::errors::{ExError, ExErrorKind};
use crate::model::State;

/// Row store backed by a `Vec` kept in `datestart` order
#[derive(Debug, Clone, Default)]
pub struct MemoryRowStore {
    rows: Vec<State>,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn rows(&self) -> &[State] {
        &self.rows
    }
}

impl RowStore for MemoryRowStore {
    fn fetch_overlapping(&self, start: &str, stop: &str) -> Result<Vec<State>, ExError> {
        Ok(self
            .rows
            .iter()
            .filter(|s| s.datestop.as_str() > start && s.datestart.as_str() < stop)
            .cloned()
            .collect())
    }

    fn fetch_all(&self) -> Result<Vec<State>, ExError> {
        Ok(self.rows.clone())
    }

    fn tail(&self, n: usize) -> Result<Vec<State>, ExError> {
        let start = self.rows.len().saturating_sub(n);
        Ok(self.rows[start..].to_vec())
    }

    fn last_state_before(&self, date: &str, pcad_mode: &str) -> Result<Option<State>, ExError> {
        Ok(self
            .rows
            .iter()
            .filter(|s| s.datestop.as_str() < date && s.pcad_mode == pcad_mode)
            .max_by(|a, b| a.datestop.cmp(&b.datestop))
            .cloned())
    }

    fn count(&self) -> Result<usize, ExError> {
        Ok(self.rows.len())
    }

    fn delete_from(&mut self, datestart: &str) -> Result<usize, ExError> {
        let before = self.rows.len();
        self.rows.retain(|s| s.datestart.as_str() < datestart);
        Ok(before - self.rows.len())
    }

    fn insert(&mut self, states: &[State]) -> Result<(), ExError> {
        for state in states {
            match self
                .rows
                .binary_search_by(|s| s.datestart.cmp(&state.datestart))
            {
                Ok(_) => {
                    return Err(ExError::new(ExErrorKind::Persistence)
                        .with_op("insert")
                        .with_date(state.datestart.clone())
                        .with_message("duplicate datestart"));
                }
                Err(pos) => self.rows.insert(pos, state.clone()),
            }
        }
        Ok(())
    }
}

/// Archive backed by a `Vec`; uninitialized until created
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    rows: Option<Vec<State>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self { rows: None }
    }

    pub fn rows(&self) -> &[State] {
        self.rows.as_deref().unwrap_or_default()
    }

    fn rows_mut(&mut self, op: &str) -> Result<&mut Vec<State>, ExError> {
        self.rows.as_mut().ok_or_else(|| not_initialized(op))
    }
}

fn not_initialized(op: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op(op)
        .with_message("archive not initialized")
}

impl ArchiveStore for MemoryArchive {
    fn is_initialized(&self) -> bool {
        self.rows.is_some()
    }

    fn create(&mut self, states: &[State]) -> Result<(), ExError> {
        self.rows = Some(states.to_vec());
        Ok(())
    }

    fn len(&self) -> Result<usize, ExError> {
        Ok(self.rows().len())
    }

    fn indices_from(&self, datestart: &str) -> Result<Vec<usize>, ExError> {
        Ok(self
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.datestart.as_str() >= datestart)
            .map(|(i, _)| i)
            .collect())
    }

    fn indices_overlapping(&self, start: &str, stop: &str) -> Result<Vec<usize>, ExError> {
        Ok(self
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.datestop.as_str() > start && s.datestart.as_str() < stop)
            .map(|(i, _)| i)
            .collect())
    }

    fn read_range(&self, start: usize, stop: usize) -> Result<Vec<State>, ExError> {
        self.rows()
            .get(start..stop)
            .map(<[State]>::to_vec)
            .ok_or_else(|| {
                ExError::new(ExErrorKind::Persistence)
                    .with_op("read_range")
                    .with_message(format!("rows {}..{} out of range", start, stop))
            })
    }

    fn append(&mut self, states: &[State]) -> Result<(), ExError> {
        self.rows_mut("append")?.extend_from_slice(states);
        Ok(())
    }

    fn remove_rows(&mut self, start: usize, stop: usize) -> Result<(), ExError> {
        let rows = self.rows_mut("remove_rows")?;
        if start > stop || stop != rows.len() {
            return Err(ExError::new(ExErrorKind::ArchiveNotContiguous)
                .with_op("remove_rows")
                .with_message(format!("rows {}..{} are not a suffix", start, stop)));
        }
        rows.truncate(start);
        Ok(())
    }
}
