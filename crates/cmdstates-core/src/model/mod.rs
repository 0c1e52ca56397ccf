pub mod command;
pub mod keys;
pub mod state;
pub mod transition;

pub use command::{Command, CommandKind, CommandRecord, ParamValue};
pub use keys::{StateKey, TransKeys};
pub use state::{default_state0, FieldValue, State};
pub use transition::{Dither, Grating, PcadMode, StateUpdate, Transition, Transitions};
