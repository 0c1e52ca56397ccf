//! Queries over state sequences and the persisted tables

use crate::errors::{Result, StatesError};
use crate::model::{default_state0, State, StateKey, TransKeys};
use crate::store::{ArchiveStore, RowStore};
use crate::time::{normalize_date, secs_to_date};

/// Upper bound used when a fetch has no stop date
const OPEN_STOP: &str = "9999:365:23:59:59.999";

/// Keep only states where one of `keys` changes.
///
/// The first state is always kept. With `allow_identical` false, a kept
/// transition whose changed values all equal the previous kept state's is
/// dropped too. `datestop`/`tstop` are re-stitched so the result still
/// partitions time.
pub fn reduce_states(states: &[State], keys: TransKeys, allow_identical: bool) -> Vec<State> {
    let mut keep: Vec<bool> = states
        .iter()
        .map(|s| s.trans_keys.intersects(&keys))
        .collect();
    let Some(first) = keep.first_mut() else {
        return Vec::new();
    };
    *first = true;

    if !allow_identical {
        for i in 1..states.len() {
            if keep[i] {
                let (prev, curr) = (&states[i - 1], &states[i]);
                if curr.trans_keys.iter().all(|k| prev.field(k) == curr.field(k)) {
                    keep[i] = false;
                }
            }
        }
    }

    let mut reduced: Vec<State> = states
        .iter()
        .zip(&keep)
        .filter(|(_, k)| **k)
        .map(|(s, _)| s.clone())
        .collect();

    for i in 0..reduced.len().saturating_sub(1) {
        reduced[i].datestop = reduced[i + 1].datestart.clone();
        reduced[i].tstop = reduced[i + 1].tstart;
    }
    if let (Some(last), Some(orig_last)) = (reduced.last_mut(), states.last()) {
        last.datestop = orig_last.datestop.clone();
        last.tstop = orig_last.tstop;
    }
    reduced
}

/// State in effect at each of `times` (mission seconds).
///
/// Each time maps to the first state whose `tstop >= time`; times past the
/// end map to the last state.
pub fn interpolate_states(states: &[State], times: &[f64]) -> Vec<State> {
    let Some(last) = states.last() else {
        return Vec::new();
    };
    times
        .iter()
        .map(|&t| {
            let i = states.partition_point(|s| s.tstop < t);
            states.get(i).unwrap_or(last).clone()
        })
        .collect()
}

/// Where [`fetch_states`] reads from
#[derive(Clone, Copy)]
pub enum Source<'a> {
    Rows(&'a dyn RowStore),
    Archive(&'a dyn ArchiveStore),
}

/// Persisted states overlapping `[start, stop)`, reduced to transitions in
/// `vals` (all keys when empty).
///
/// # Errors
///
/// - `InvalidDate` for an unparseable bound
/// - `ArchiveNotContiguous` if matching archive rows are out of order
/// - `Persistence` on backend failure
pub fn fetch_states(
    source: Source<'_>,
    start: &str,
    stop: Option<&str>,
    vals: &[StateKey],
    allow_identical: bool,
) -> Result<Vec<State>> {
    let start = normalize_date(start)?;
    let stop = match stop {
        Some(s) => normalize_date(s)?,
        None => OPEN_STOP.to_string(),
    };

    let states = match source {
        Source::Rows(rows) => rows.fetch_overlapping(&start, &stop)?,
        Source::Archive(archive) => {
            let idxs = archive.indices_overlapping(&start, &stop)?;
            match (idxs.iter().min(), idxs.iter().max()) {
                (Some(&i0), Some(&i1)) => {
                    if i1 - i0 != idxs.len() - 1 {
                        return Err(StatesError::ArchiveNotContiguous { datestart: start });
                    }
                    archive.read_range(i0, i1 + 1)?
                }
                _ => Vec::new(),
            }
        }
    };

    let keys: TransKeys = if vals.is_empty() {
        StateKey::ALL.into_iter().collect()
    } else {
        vals.iter().copied().collect()
    };
    Ok(reduce_states(&states, keys, allow_identical))
}

/// Starting state for an update at `date`.
///
/// Picks the latest persisted NPNT state ending before `date`, where `date`
/// is capped at `date_margin_days` before `now_secs`; rows newer than that
/// are not yet definitive. Falls back to [`default_state0`].
///
/// # Errors
///
/// `InvalidDate` or `Persistence`.
pub fn get_state0(
    rows: &dyn RowStore,
    date: Option<&str>,
    now_secs: f64,
    date_margin_days: f64,
) -> Result<State> {
    let definitive = secs_to_date(now_secs - date_margin_days * 86400.0)?;
    let date = match date {
        Some(d) => normalize_date(d)?.min(definitive),
        None => definitive,
    };

    match rows.last_state_before(&date, "NPNT")? {
        Some(state) => {
            tracing::debug!(datestart = state.datestart.as_str(), "found definitive state0");
            Ok(state)
        }
        None => {
            let state = default_state0()?;
            tracing::debug!(datestart = state.datestart.as_str(), "using default state0");
            Ok(state)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StateUpdate;
    use crate::time::date_to_secs;

    /// Chain of states starting from the default, one update each
    fn chain(updates: &[(&str, StateUpdate)]) -> Vec<State> {
        let mut states = vec![default_state0().unwrap()];
        for (date, update) in updates {
            let mut next = states[states.len() - 1].clone();
            next.datestart = date.to_string();
            next.tstart = date_to_secs(date).unwrap();
            next.apply(update);
            next.trans_keys = [update.key()].into_iter().collect();
            states.push(next);
        }
        let n = states.len();
        for i in 0..n - 1 {
            states[i].datestop = states[i + 1].datestart.clone();
            states[i].tstop = states[i + 1].tstart;
        }
        states
    }

    #[test]
    fn test_reduce_keeps_only_requested_transitions() {
        let states = chain(&[
            ("2010:001:00:00:00.000", StateUpdate::Obsid(1)),
            ("2010:002:00:00:00.000", StateUpdate::Simpos(75624)),
            ("2010:003:00:00:00.000", StateUpdate::Obsid(2)),
        ]);
        let keys: TransKeys = [StateKey::Obsid].into_iter().collect();
        let reduced = reduce_states(&states, keys, true);

        assert_eq!(reduced.len(), 3);
        assert_eq!(reduced[1].datestop, "2010:003:00:00:00.000");
        assert_eq!(reduced[2].datestop, states[3].datestop);
    }

    #[test]
    fn test_reduce_drops_identical_when_asked() {
        let states = chain(&[
            ("2010:001:00:00:00.000", StateUpdate::Obsid(61358)),
            ("2010:002:00:00:00.000", StateUpdate::Obsid(5)),
        ]);
        let keys: TransKeys = [StateKey::Obsid].into_iter().collect();
        assert_eq!(reduce_states(&states, keys, true).len(), 3);
        let reduced = reduce_states(&states, keys, false);
        assert_eq!(reduced.len(), 2);
        assert_eq!(reduced[0].datestop, "2010:002:00:00:00.000");
    }

    #[test]
    fn test_interpolate_picks_state_by_tstop() {
        let states = chain(&[("2010:001:00:00:00.000", StateUpdate::Obsid(7))]);
        let t_split = states[0].tstop;
        let picked = interpolate_states(&states, &[t_split - 1.0, t_split + 1.0, 1e12]);
        let obsids: Vec<i64> = picked.iter().map(|s| s.obsid).collect();
        assert_eq!(obsids, vec![61358, 7, 7]);
    }
}
