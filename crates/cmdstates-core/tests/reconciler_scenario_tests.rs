#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use cmdstates_core::errors::ExErrorKind;
use cmdstates_core::reconcile::{
    check_consistency, reconcile, state_mismatches, update_states, Divergence, UpdateOptions,
};
use cmdstates_core::store::{ArchiveStore, MemoryArchive, MemoryRowStore, RowStore};
use cmdstates_core::{default_state0, State, StatesError};
use common::{obsid_sequence, FailingInsertRows};

/// Stores populated by a clean first run over `states`
fn seeded(states: &[State]) -> (MemoryRowStore, MemoryArchive) {
    let mut rows = MemoryRowStore::new();
    let mut archive = MemoryArchive::new();
    update_states(states, &mut rows, &mut archive, &UpdateOptions::default()).unwrap();
    (rows, archive)
}

#[test]
fn test_first_run_populates_rows_then_creates_archive() {
    let states = obsid_sequence(5);
    let mut rows = MemoryRowStore::new();
    let mut archive = MemoryArchive::new();

    let outcome =
        update_states(&states, &mut rows, &mut archive, &UpdateOptions::default()).unwrap();

    assert!(outcome.changed());
    assert!(outcome.applied.bootstrapped);
    assert_eq!(outcome.applied.inserted, 5);
    assert_eq!(outcome.applied.deleted_rows, 0);
    assert_eq!(rows.rows(), &states[..]);
    assert_eq!(archive.rows(), &states[..]);
    assert!(outcome.consistency.is_consistent());
}

#[test]
fn test_divergence_replaces_suffix_in_both_stores() {
    let persisted = obsid_sequence(5);
    let (mut rows, mut archive) = seeded(&persisted);

    let mut states = persisted.clone();
    states[3].obsid = 9999;

    let recon = reconcile(&states, &rows).unwrap();
    assert_eq!(recon.divergence_index(), Some(3));
    assert_eq!(recon.mismatch_keys(), vec!["obsid"]);

    let outcome =
        update_states(&states, &mut rows, &mut archive, &UpdateOptions::default()).unwrap();
    assert_eq!(outcome.applied.deleted_rows, 2);
    assert_eq!(outcome.applied.deleted_archive_rows, 2);
    assert_eq!(outcome.applied.inserted, 2);
    assert_eq!(rows.rows()[3].obsid, 9999);
    assert_eq!(archive.rows(), rows.rows());
    assert_eq!(outcome.consistency.checked, 5);
    assert!(outcome.consistency.is_consistent());
}

#[test]
fn test_second_identical_run_is_a_noop() {
    let states = obsid_sequence(5);
    let (mut rows, mut archive) = seeded(&states);

    let recon = reconcile(&states, &rows).unwrap();
    assert_eq!(recon.divergence, Divergence::Unchanged);
    assert!(recon.mismatch_keys().is_empty());

    let outcome =
        update_states(&states, &mut rows, &mut archive, &UpdateOptions::default()).unwrap();
    assert!(!outcome.changed());
    assert_eq!(outcome.applied.inserted, 0);
    assert_eq!(rows.count().unwrap(), 5);
    assert_eq!(archive.len().unwrap(), 5);
}

#[test]
fn test_unchanged_run_checks_fewer_rows() {
    let states = obsid_sequence(6);
    let (mut rows, mut archive) = seeded(&states);
    let opts = UpdateOptions {
        n_check_changed: 6,
        n_check_unchanged: 2,
    };
    let outcome = update_states(&states, &mut rows, &mut archive, &opts).unwrap();
    assert_eq!(outcome.consistency.checked, 2);
}

#[test]
fn test_float_tolerance_is_exclusive() {
    let mut old = default_state0().unwrap();
    let mut new = old.clone();
    old.pitch = 0.0;
    new.pitch = 0.0003;
    assert!(state_mismatches(&old, &new).is_empty());

    new.pitch = 0.00031;
    let m = state_mismatches(&old, &new);
    assert_eq!(m.len(), 1);
    assert_eq!(m[0].column, "pitch");
}

#[test]
fn test_float_tolerance_at_realistic_pitch() {
    let mut old = default_state0().unwrap();
    let mut new = old.clone();
    old.pitch = 61.37;
    new.pitch = 61.3703;
    assert!(state_mismatches(&old, &new).is_empty());
    new.pitch = 61.3697;
    assert!(state_mismatches(&old, &new).is_empty());

    new.pitch = 61.37031;
    let m = state_mismatches(&old, &new);
    assert_eq!(m.len(), 1);
    assert_eq!(m[0].column, "pitch");
}

#[test]
fn test_attitude_separation_tolerance() {
    let mut old = default_state0().unwrap();
    let mut new = old.clone();
    old.ra = 352.0;
    old.dec = -11.5;
    new.ra = 352.0;
    new.dec = -11.5003;
    assert!(state_mismatches(&old, &new).is_empty());

    new.dec = -11.50031;
    let m = state_mismatches(&old, &new);
    assert_eq!(m.len(), 1);
    assert_eq!(m[0].column, "attitude");

    // Along a small circle ra drift is scaled by cos(dec)
    new.dec = old.dec;
    new.ra = 352.0 + 0.0003 / (-11.5f64).to_radians().cos();
    assert!(state_mismatches(&old, &new).is_empty());
}

#[test]
fn test_divergence_at_first_row_refuses_to_empty_archive() {
    let persisted = obsid_sequence(5);
    let (mut rows, mut archive) = seeded(&persisted);

    let mut states = persisted.clone();
    states[0].obsid = 1;
    let err =
        update_states(&states, &mut rows, &mut archive, &UpdateOptions::default()).unwrap_err();

    assert_eq!(
        err,
        StatesError::ArchiveWouldEmpty {
            datestart: persisted[0].datestart.clone(),
            n_rows: 5,
        }
    );
    assert_eq!(rows.rows(), &persisted[..]);
    assert_eq!(archive.rows(), &persisted[..]);
}

#[test]
fn test_out_of_order_archive_blocks_deletion() {
    let persisted = obsid_sequence(5);
    let (mut rows, _) = seeded(&persisted);
    let mut archive = MemoryArchive::new();
    let shuffled: Vec<State> = [0, 2, 1, 3, 4]
        .iter()
        .map(|&i| persisted[i].clone())
        .collect();
    archive.create(&shuffled).unwrap();

    let mut states = persisted.clone();
    states[2].obsid = 42;
    let err =
        update_states(&states, &mut rows, &mut archive, &UpdateOptions::default()).unwrap_err();

    assert!(matches!(err, StatesError::ArchiveNotContiguous { .. }));
    assert_eq!(err.code(), "ERR_ARCHIVE_NOT_CONTIGUOUS");
    assert_eq!(rows.count().unwrap(), 5);
    assert_eq!(archive.rows(), &shuffled[..]);
}

#[test]
fn test_missing_archive_is_created_from_rows() {
    let states = obsid_sequence(5);
    let mut rows = MemoryRowStore::new();
    rows.insert(&states).unwrap();
    let mut archive = MemoryArchive::new();

    let outcome =
        update_states(&states, &mut rows, &mut archive, &UpdateOptions::default()).unwrap();

    assert!(!outcome.changed());
    assert!(outcome.applied.bootstrapped);
    assert_eq!(archive.rows(), &states[..]);
    assert!(outcome.consistency.is_consistent());
}

#[test]
fn test_new_loads_extend_the_tables() {
    let (mut rows, mut archive) = seeded(&obsid_sequence(4));
    let states = obsid_sequence(6);

    let outcome =
        update_states(&states, &mut rows, &mut archive, &UpdateOptions::default()).unwrap();

    // The old last row was open-ended; it now stops at the next load
    match &outcome.divergence {
        Divergence::At { index, mismatches } => {
            assert_eq!(*index, 3);
            assert_eq!(mismatches[0].column, "datestop");
        }
        Divergence::Unchanged => panic!("expected divergence"),
    }
    assert_eq!(rows.rows(), &states[..]);
    assert_eq!(archive.rows(), &states[..]);
}

#[test]
fn test_shorter_recompute_truncates_the_tables() {
    let (mut rows, mut archive) = seeded(&obsid_sequence(6));
    let states = obsid_sequence(4);

    let outcome =
        update_states(&states, &mut rows, &mut archive, &UpdateOptions::default()).unwrap();

    assert_eq!(outcome.applied.deleted_rows, 3);
    assert_eq!(outcome.applied.inserted, 1);
    assert_eq!(rows.rows(), &states[..]);
    assert_eq!(archive.rows(), &states[..]);
}

#[test]
fn test_tampered_archive_reports_earliest_mismatch() {
    let states = obsid_sequence(5);
    let mut rows = MemoryRowStore::new();
    rows.insert(&states).unwrap();

    let mut tampered = states.clone();
    tampered[2].si_mode = "TE_BOGUS".to_string();
    tampered[4].obsid = 7;
    let mut archive = MemoryArchive::new();
    archive.create(&tampered).unwrap();

    let outcome =
        update_states(&states, &mut rows, &mut archive, &UpdateOptions::default()).unwrap();

    assert!(!outcome.changed());
    let report = &outcome.consistency;
    assert_eq!(report.row_count, report.archive_count);
    assert_eq!(report.mismatched, 2);
    assert_eq!(report.first_mismatch.as_deref(), Some(states[2].datestart.as_str()));
    assert!(!report.is_consistent());
}

#[test]
fn test_row_insert_failure_leaves_stores_out_of_step() {
    let persisted = obsid_sequence(5);
    let (rows, mut archive) = seeded(&persisted);
    let mut rows = FailingInsertRows(rows);

    let mut states = persisted.clone();
    states[3].obsid = 9999;
    let err =
        update_states(&states, &mut rows, &mut archive, &UpdateOptions::default()).unwrap_err();

    match err {
        StatesError::Persistence(inner) => assert_eq!(inner.kind(), ExErrorKind::Persistence),
        other => panic!("unexpected error {other:?}"),
    }

    // Archive already holds the new tail; the rows lost theirs
    assert_eq!(archive.len().unwrap(), 5);
    assert_eq!(archive.rows()[3].obsid, 9999);
    let report = check_consistency(&rows, &archive, 100).unwrap();
    assert_eq!(report.row_count, 3);
    assert!(!report.is_consistent());
}

#[test]
fn test_empty_states_rejected_before_touching_stores() {
    let mut rows = MemoryRowStore::new();
    let mut archive = MemoryArchive::new();
    let err = update_states(&[], &mut rows, &mut archive, &UpdateOptions::default()).unwrap_err();
    assert_eq!(err, StatesError::EmptyStates);
    assert!(!archive.is_initialized());
}
