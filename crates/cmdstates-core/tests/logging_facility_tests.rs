#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use cmdstates_core::core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_COMPONENT, FIELD_DATESTART, FIELD_DURATION_MS,
    FIELD_ERR_CODE, FIELD_ERR_KIND, FIELD_N_CMDS, FIELD_N_STATES, FIELD_RUN_ID,
};
use cmdstates_core::errors::StatesError;
use cmdstates_core::logging_facility::test_capture::init_test_capture;
use cmdstates_core::reconcile::{update_states, UpdateOptions};
use cmdstates_core::store::{MemoryArchive, MemoryRowStore};
use cmdstates_core::{log_op_end, log_op_error, log_op_start};
use common::obsid_sequence;

#[test]
fn test_log_op_end_records_duration() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_1";

    log_op_end!(op_name, duration_ms = 42, n_states = 3);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.as_deref(), Some(EVENT_END));
    assert_eq!(events[0].fields.get(FIELD_DURATION_MS), Some(&"42".to_string()));
    assert_eq!(events[0].fields.get(FIELD_N_STATES), Some(&"3".to_string()));
    assert!(events[0].fields.contains_key(FIELD_COMPONENT));
}

#[test]
fn test_log_op_error_carries_code_and_kind() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_2";

    let err = StatesError::InvalidPowerCommand {
        mnemonic: "WSPOW1".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 7);

    let errors: Vec<_> = capture
        .events_for_op(op_name)
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].level, tracing::Level::ERROR);
    assert_eq!(
        errors[0].fields.get(FIELD_ERR_CODE),
        Some(&"ERR_INVALID_POWER_COMMAND".to_string())
    );
    assert_eq!(
        errors[0].fields.get(FIELD_ERR_KIND),
        Some(&"InvalidPowerCommand".to_string())
    );
}

#[test]
fn test_update_states_logs_start_and_end() {
    let capture = init_test_capture();
    let states = obsid_sequence(3);

    let outcome = update_states(
        &states,
        &mut MemoryRowStore::new(),
        &mut MemoryArchive::new(),
        &UpdateOptions::default(),
    )
    .unwrap();

    capture.assert_event_exists("update_states", EVENT_START);
    capture.assert_event_exists("update_states", EVENT_END);
    capture.assert_event_exists("get_states", EVENT_END);

    let starts: Vec<_> = capture
        .events_for_op("get_states")
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_START))
        .collect();
    assert!(starts.iter().any(|e| {
        e.fields.get(FIELD_DATESTART).map(String::as_str) == Some("2002:007:13:00:00.000")
            && e.fields.contains_key(FIELD_N_CMDS)
    }));

    let ends: Vec<_> = capture
        .events_for_op("update_states")
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END))
        .collect();
    assert!(ends
        .iter()
        .any(|e| e.fields.get(FIELD_RUN_ID) == Some(&outcome.run_id.to_string())));
}

#[test]
fn test_update_states_failure_logs_error_code() {
    let capture = init_test_capture();

    let err = update_states(
        &[],
        &mut MemoryRowStore::new(),
        &mut MemoryArchive::new(),
        &UpdateOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err, StatesError::EmptyStates);

    let n = capture.count_events(|e| {
        e.op.as_deref() == Some("update_states")
            && e.event.as_deref() == Some(EVENT_END_ERROR)
            && e.fields.get(FIELD_ERR_CODE).map(String::as_str) == Some("ERR_EMPTY_STATES")
    });
    assert!(n >= 1);
}
