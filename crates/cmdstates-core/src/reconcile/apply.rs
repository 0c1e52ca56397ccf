//! Dual-Store Consistency Manager: applying a reconciliation
//!
//! The archive is always written before the row store. Archive guards are
//! checked before anything is touched, so a refused deletion leaves both
//! stores as they were. A failure between the two writes leaves them out of
//! step until the next consistency check or run; there is no transaction
//! spanning both backends.

use super::model::{ApplyOutcome, Divergence, Reconciliation};
use crate::errors::{Result, StatesError};
use crate::model::State;
use crate::store::{ArchiveStore, RowStore};

/// Bring both stores in line with `states` as decided by `recon`.
///
/// # Errors
///
/// - `ArchiveNoMatch`, `ArchiveNotContiguous`, `ArchiveWouldEmpty` if the
///   archive suffix cannot be removed safely (nothing is modified)
/// - `Persistence` if either backend fails
pub fn apply(
    recon: &Reconciliation,
    states: &[State],
    rows: &mut dyn RowStore,
    archive: &mut dyn ArchiveStore,
) -> Result<ApplyOutcome> {
    let Divergence::At { index, .. } = recon.divergence else {
        return Ok(ApplyOutcome::default());
    };

    let mut outcome = ApplyOutcome::default();
    if let Some(row) = recon.persisted.get(index) {
        let (n_archive, n_rows) = delete_states(&row.datestart, rows, archive)?;
        outcome.deleted_archive_rows = n_archive;
        outcome.deleted_rows = n_rows;
    }

    let new_rows = states.get(index..).unwrap_or_default();
    outcome.bootstrapped = insert_states(new_rows, index, rows, archive)?;
    outcome.inserted = new_rows.len();
    Ok(outcome)
}

/// Delete rows with `datestart >=` the given date from both stores.
///
/// Returns the number of archive and row store rows removed.
///
/// # Errors
///
/// Archive guard violations or backend failure.
pub fn delete_states(
    datestart: &str,
    rows: &mut dyn RowStore,
    archive: &mut dyn ArchiveStore,
) -> Result<(usize, usize)> {
    let mut n_archive = 0;
    if archive.is_initialized() {
        let n_total = archive.len()?;
        let mut idxs = archive.indices_from(datestart)?;
        idxs.sort_unstable();

        let (Some(&first), Some(&last)) = (idxs.first(), idxs.last()) else {
            tracing::error!(datestart, "expected to delete archive rows but none matched");
            return Err(StatesError::ArchiveNoMatch {
                datestart: datestart.to_string(),
            });
        };
        let contiguous = idxs.windows(2).all(|w| w[1] == w[0] + 1);
        if !contiguous || last + 1 != n_total {
            tracing::error!(datestart, "archive is not ordered by datestart");
            return Err(StatesError::ArchiveNotContiguous {
                datestart: datestart.to_string(),
            });
        }
        if first == 0 {
            tracing::error!(datestart, n_total, "refusing to delete every archive row");
            return Err(StatesError::ArchiveWouldEmpty {
                datestart: datestart.to_string(),
                n_rows: n_total,
            });
        }

        archive.remove_rows(first, n_total)?;
        n_archive = n_total - first;
        tracing::info!(from = first, to = n_total - 1, "removed archive rows");
    }

    let n_rows = rows.delete_from(datestart)?;
    tracing::info!(datestart, n_rows, "deleted row store states");
    Ok((n_archive, n_rows))
}

/// Append `states` to both stores, archive first.
///
/// `offset` is only used for logging. Returns whether the archive had to be
/// created from the row store afterwards.
///
/// # Errors
///
/// Backend failure.
pub fn insert_states(
    states: &[State],
    offset: usize,
    rows: &mut dyn RowStore,
    archive: &mut dyn ArchiveStore,
) -> Result<bool> {
    let end = offset + states.len();
    if archive.is_initialized() {
        tracing::info!("inserting states[{}:{}] to archive", offset, end);
        archive.append(states)?;
    }

    tracing::info!("inserting states[{}:{}] to row store", offset, end);
    rows.insert(states)?;

    if archive.is_initialized() {
        Ok(false)
    } else {
        bootstrap_archive(rows, archive)
    }
}

/// Create the archive from the full row store content.
///
/// Does nothing when the row store is empty. Returns whether the archive
/// was created.
///
/// # Errors
///
/// Backend failure.
pub fn bootstrap_archive(rows: &dyn RowStore, archive: &mut dyn ArchiveStore) -> Result<bool> {
    let all = rows.fetch_all()?;
    if all.is_empty() {
        tracing::info!("no rows in row store, not creating archive");
        return Ok(false);
    }
    tracing::info!(n_rows = all.len(), "creating archive from row store");
    archive.create(&all)?;
    Ok(true)
}
