//! Commanded States Core - interpreter and reconciler for spacecraft
//! commanded states
//!
//! This crate provides:
//! - The state model (fixed-schema `State`, typed transitions, `trans_keys`)
//! - Date/mission-seconds conversion and attitude geometry
//! - The Power-Command Decoder and the Maneuver Oracle interface
//! - The State Transition Interpreter (`get_states`)
//! - The State Table Reconciler and Dual-Store Consistency Manager
//! - Store interfaces with in-memory backends

pub mod attitude;
pub mod cmd_sets;
pub mod digest;
pub mod errors;
pub mod interpret;
pub mod logging_facility;
pub mod model;
pub mod oracle;
pub mod power;
pub mod queries;
pub mod reconcile;
pub mod store;
pub mod time;

pub use cmdstates_core_types as core_types;

// Re-export commonly used types
pub use attitude::Quat;
pub use cmd_sets::{generate_cmds, CmdSet};
pub use errors::{ExError, ExErrorKind, Result, StatesError};
pub use interpret::{check_window, get_states, InterpretOptions};
pub use model::{default_state0, Command, CommandKind, CommandRecord, State, StateKey, TransKeys};
pub use oracle::{AttitudeSample, ManeuverOracle, SlerpManeuverOracle};
pub use power::{decode_power, PowerInfo};
pub use queries::{fetch_states, get_state0, interpolate_states, reduce_states, Source};
pub use reconcile::{update_states, Divergence, UpdateOptions, UpdateOutcome};
pub use store::{ArchiveStore, RowStore};
