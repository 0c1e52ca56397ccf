//! Reconciliation output types

use serde::Serialize;

use crate::model::State;
use cmdstates_core_types::RunId;

/// One attribute that differs between a persisted and a recomputed row
///
/// `column` is a schema column name, or `attitude` when the pointing moved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub column: &'static str,
    pub old: String,
    pub new: String,
}

/// Where the persisted rows and the recomputed states part ways
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Divergence {
    /// Same rows, same values: nothing to write
    Unchanged,
    /// Rows from `index` on must be replaced. `mismatches` is empty when the
    /// sequences only differ in length or nothing was persisted.
    At {
        index: usize,
        mismatches: Vec<Mismatch>,
    },
}

/// Result of comparing recomputed states against the row store
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Persisted rows overlapping the recomputed span
    pub persisted: Vec<State>,
    pub divergence: Divergence,
}

impl Reconciliation {
    pub fn divergence_index(&self) -> Option<usize> {
        match &self.divergence {
            Divergence::Unchanged => None,
            Divergence::At { index, .. } => Some(*index),
        }
    }

    /// Sorted names of the mismatched attributes at the divergence point
    pub fn mismatch_keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = match &self.divergence {
            Divergence::Unchanged => Vec::new(),
            Divergence::At { mismatches, .. } => mismatches.iter().map(|m| m.column).collect(),
        };
        keys.sort_unstable();
        keys
    }
}

/// What the consistency manager wrote
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    pub deleted_rows: usize,
    pub deleted_archive_rows: usize,
    pub inserted: usize,
    /// Archive was created from the row store during this apply
    pub bootstrapped: bool,
}

/// Post-apply comparison of the two stores
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub row_count: usize,
    pub archive_count: usize,
    /// Trailing rows compared
    pub checked: usize,
    pub mismatched: usize,
    /// Earliest `datestart` among mismatched rows
    pub first_mismatch: Option<String>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.row_count == self.archive_count && self.mismatched == 0
    }
}

/// Summary of one update run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateOutcome {
    pub run_id: RunId,
    pub divergence: Divergence,
    pub applied: ApplyOutcome,
    pub consistency: ConsistencyReport,
}

impl UpdateOutcome {
    /// Whether either store was written
    pub fn changed(&self) -> bool {
        self.divergence != Divergence::Unchanged
    }
}
