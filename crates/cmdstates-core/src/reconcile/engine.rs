//! State Table Reconciler
//!
//! Finds the first row at which recomputed states disagree with what the
//! row store holds. Non-float columns must match exactly; pitch and pointing
//! may drift by up to [`FLOAT_TOLERANCE`] degrees.

use super::model::{Divergence, Mismatch, Reconciliation};
use crate::attitude::sph_dist;
use crate::errors::{Result, StatesError};
use crate::model::State;
use crate::store::RowStore;

/// Pitch and attitude-separation threshold, degrees
pub const FLOAT_TOLERANCE: f64 = 0.0003;

/// Rounding slack on top of [`FLOAT_TOLERANCE`]. Pitch values near 90 carry
/// about 1e-14 of representation error, so a stored 61.37 against a
/// recomputed 61.3703 differs by slightly more than 0.0003 in `f64`.
const FLOAT_EPSILON: f64 = 1e-9;

/// A float drift of exactly [`FLOAT_TOLERANCE`] still matches.
fn exceeds_tolerance(diff: f64) -> bool {
    diff > FLOAT_TOLERANCE + FLOAT_EPSILON
}

/// Rows either side of the divergence point included in diagnostics
const LOG_WINDOW: usize = 4;

macro_rules! exact_columns {
    ($old:expr, $new:expr, $out:expr, [$($col:ident),* $(,)?]) => {
        $(
            if $old.$col != $new.$col {
                $out.push(Mismatch {
                    column: stringify!($col),
                    old: $old.$col.to_string(),
                    new: $new.$col.to_string(),
                });
            }
        )*
    };
}

/// Attributes of `new` that disagree with `old`, in column order.
pub fn state_mismatches(old: &State, new: &State) -> Vec<Mismatch> {
    let mut out = Vec::new();
    exact_columns!(
        old,
        new,
        out,
        [
            datestart, datestop, obsid, power_cmd, si_mode, pcad_mode, vid_board, clocking,
            fep_count, ccd_count, simpos, simfa_pos, trans_keys, hetg, letg, dither,
        ]
    );

    if exceeds_tolerance((old.pitch - new.pitch).abs()) {
        out.push(Mismatch {
            column: "pitch",
            old: old.pitch.to_string(),
            new: new.pitch.to_string(),
        });
    }
    if exceeds_tolerance(sph_dist(old.ra, old.dec, new.ra, new.dec)) {
        out.push(Mismatch {
            column: "attitude",
            old: format!("ra: {:9.5} dec: {:9.5}", old.ra, old.dec),
            new: format!("ra: {:9.5} dec: {:9.5}", new.ra, new.dec),
        });
    }
    out
}

/// Compare `persisted` and `states` position by position.
pub fn find_divergence(persisted: &[State], states: &[State]) -> Divergence {
    for (index, (old, new)) in persisted.iter().zip(states).enumerate() {
        let mismatches = state_mismatches(old, new);
        if !mismatches.is_empty() {
            log_mismatch(&mismatches, persisted, states, index);
            return Divergence::At { index, mismatches };
        }
    }

    if persisted.len() == states.len() {
        Divergence::Unchanged
    } else {
        // One side ends early: extension by new loads, or truncation after
        // an interrupt
        Divergence::At {
            index: persisted.len().min(states.len()),
            mismatches: Vec::new(),
        }
    }
}

/// Compare recomputed `states` against the overlapping rows of `rows`.
///
/// # Errors
///
/// - `EmptyStates` if `states` is empty
/// - `Persistence` if the row store fails
pub fn reconcile(states: &[State], rows: &dyn RowStore) -> Result<Reconciliation> {
    let (Some(first), Some(last)) = (states.first(), states.last()) else {
        return Err(StatesError::EmptyStates);
    };

    let persisted = rows.fetch_overlapping(&first.datestart, &last.datestop)?;
    tracing::debug!(
        n_persisted = persisted.len(),
        n_states = states.len(),
        "fetched overlapping rows"
    );

    let divergence = if persisted.is_empty() {
        Divergence::At {
            index: 0,
            mismatches: Vec::new(),
        }
    } else {
        find_divergence(&persisted, states)
    };

    if divergence == Divergence::Unchanged {
        tracing::debug!("no row store update required");
    }
    Ok(Reconciliation {
        persisted,
        divergence,
    })
}

fn log_mismatch(mismatches: &[Mismatch], persisted: &[State], states: &[State], index: usize) {
    let columns: Vec<&str> = mismatches.iter().map(|m| m.column).collect();
    tracing::debug!(
        index,
        db_datestart = persisted[index].datestart.as_str(),
        new_datestart = states[index].datestart.as_str(),
        columns = ?columns,
        "mismatch between persisted and recomputed states"
    );
    for m in mismatches {
        tracing::debug!(column = m.column, db = m.old.as_str(), new = m.new.as_str());
    }

    let i0 = index.saturating_sub(LOG_WINDOW);
    tracing::debug!("** Existing DB states");
    for s in &persisted[i0..(index + LOG_WINDOW).min(persisted.len())] {
        tracing::debug!("{}", format_row(s));
    }
    tracing::debug!("** New states");
    for s in &states[i0..(index + LOG_WINDOW).min(states.len())] {
        tracing::debug!("{}", format_row(s));
    }
}

fn format_row(s: &State) -> String {
    format!(
        "{} {} {:>6} {:<11} {:<8} {:<5} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {}",
        s.datestart,
        s.datestop,
        s.obsid,
        s.power_cmd,
        s.si_mode,
        s.pcad_mode,
        s.pitch,
        s.ra,
        s.dec,
        s.roll,
        s.trans_keys
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::default_state0;

    #[test]
    fn test_identical_states_have_no_mismatch() {
        let s = default_state0().unwrap();
        assert!(state_mismatches(&s, &s.clone()).is_empty());
    }

    #[test]
    fn test_attitude_mismatch_reported_once() {
        let old = default_state0().unwrap();
        let mut new = old.clone();
        new.ra += 0.01;
        new.dec -= 0.01;
        let m = state_mismatches(&old, &new);
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].column, "attitude");
    }

    #[test]
    fn test_quaternion_only_drift_is_ignored() {
        let old = default_state0().unwrap();
        let mut new = old.clone();
        new.q1 += 1e-3;
        new.roll += 1.0;
        assert!(state_mismatches(&old, &new).is_empty());
    }

    #[test]
    fn test_length_difference_diverges_at_shorter_end() {
        let s = default_state0().unwrap();
        let persisted = vec![s.clone(), s.clone()];
        let states = vec![s.clone(), s.clone(), s];
        assert_eq!(
            find_divergence(&persisted, &states),
            Divergence::At {
                index: 2,
                mismatches: Vec::new()
            }
        );
        assert_eq!(
            find_divergence(&states, &persisted),
            Divergence::At {
                index: 2,
                mismatches: Vec::new()
            }
        );
    }
}
