//! One reconciliation run: reconcile, apply, verify

use super::apply::{apply, bootstrap_archive};
use super::consistency::check_consistency;
use super::engine::reconcile;
use super::model::{ApplyOutcome, UpdateOutcome};
use crate::errors::{Result, StatesError};
use crate::model::State;
use crate::store::{ArchiveStore, RowStore};
use crate::{log_op_end, log_op_error, log_op_start};
use cmdstates_core_types::RunId;

/// Trailing rows compared after a run that changed the stores
pub const N_CHECK_CHANGED: usize = 3000;
/// Trailing rows compared after a no-op run
pub const N_CHECK_UNCHANGED: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    pub n_check_changed: usize,
    pub n_check_unchanged: usize,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            n_check_changed: N_CHECK_CHANGED,
            n_check_unchanged: N_CHECK_UNCHANGED,
        }
    }
}

/// Make both stores agree with `states`.
///
/// Creates the archive from the row store first if it was never populated,
/// then reconciles, applies and checks consistency. Runs are assumed to be
/// scheduled one at a time.
///
/// # Errors
///
/// - `EmptyStates` if `states` is empty
/// - archive guard violations from [`apply`]
/// - `Persistence` on backend failure
pub fn update_states(
    states: &[State],
    rows: &mut dyn RowStore,
    archive: &mut dyn ArchiveStore,
    opts: &UpdateOptions,
) -> Result<UpdateOutcome> {
    let run_id = RunId::new();
    let span = tracing::info_span!("update_states", run_id = %run_id);
    let _guard = span.enter();

    log_op_start!("update_states", n_states = states.len());
    let start = std::time::Instant::now();

    let outcome = update_states_impl(run_id, states, rows, archive, opts).map_err(|e| {
        log_op_error!(
            "update_states",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "update_states",
        duration_ms = start.elapsed().as_millis() as u64,
        run_id = %outcome.run_id,
        changed = outcome.changed(),
        inserted = outcome.applied.inserted
    );
    Ok(outcome)
}

fn update_states_impl(
    run_id: RunId,
    states: &[State],
    rows: &mut dyn RowStore,
    archive: &mut dyn ArchiveStore,
    opts: &UpdateOptions,
) -> Result<UpdateOutcome> {
    if states.is_empty() {
        return Err(StatesError::EmptyStates);
    }

    let mut bootstrapped = false;
    if !archive.is_initialized() {
        bootstrapped = bootstrap_archive(rows, archive)?;
    }

    let recon = reconcile(states, rows)?;
    let mut applied = match recon.divergence_index() {
        Some(_) => apply(&recon, states, rows, archive)?,
        None => ApplyOutcome::default(),
    };
    applied.bootstrapped |= bootstrapped;

    let n_check = if recon.divergence_index().is_some() {
        opts.n_check_changed
    } else {
        opts.n_check_unchanged
    };
    let consistency = check_consistency(rows, archive, n_check)?;

    Ok(UpdateOutcome {
        run_id,
        divergence: recon.divergence,
        applied,
        consistency,
    })
}
