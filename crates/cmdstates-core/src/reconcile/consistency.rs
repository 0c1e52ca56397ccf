//! Post-apply consistency check between the row store and the archive

use super::engine::state_mismatches;
use super::model::ConsistencyReport;
use crate::errors::Result;
use crate::store::{ArchiveStore, RowStore};

/// Compare row counts and the trailing `n_check` rows of both stores.
///
/// Mismatches are logged at error level and reported; nothing is repaired.
///
/// # Errors
///
/// Backend failure while reading either store.
pub fn check_consistency(
    rows: &dyn RowStore,
    archive: &dyn ArchiveStore,
    n_check: usize,
) -> Result<ConsistencyReport> {
    let row_count = rows.count()?;
    let archive_count = archive.len()?;
    if row_count != archive_count {
        tracing::error!(
            row_count,
            archive_count,
            "row store and archive have different length"
        );
    }

    let db_tail = rows.tail(n_check)?;
    let archive_tail = archive.read_range(archive_count.saturating_sub(n_check), archive_count)?;

    // Walk backwards from the end; the last mismatch seen is the earliest
    let mut report = ConsistencyReport {
        row_count,
        archive_count,
        ..ConsistencyReport::default()
    };
    for (db_row, archive_row) in db_tail.iter().rev().zip(archive_tail.iter().rev()) {
        report.checked += 1;
        if !state_mismatches(db_row, archive_row).is_empty() {
            report.mismatched += 1;
            report.first_mismatch = Some(db_row.datestart.clone());
        }
    }

    if let Some(date) = &report.first_mismatch {
        tracing::error!(
            first_mismatch = date.as_str(),
            mismatched = report.mismatched,
            "row store and archive show mismatch"
        );
    } else {
        tracing::debug!(checked = report.checked, "row store and archive tails agree");
    }
    Ok(report)
}
