//! Reconciling recomputed states with the row store and the archive
//!
//! ## Entry point
//!
//! [`update_states`] runs the whole cycle. The pieces are public so callers
//! and tests can drive each phase:
//!
//! - [`reconcile`]: find the divergence index against the row store
//! - [`apply`]: delete the stale suffix and append the new tail, archive first
//! - [`check_consistency`]: compare the trailing rows of both stores
//!
//! ## Guarantees
//!
//! - **Idempotency**: reconciling the same states twice in a row yields
//!   `Divergence::Unchanged` the second time.
//! - **Archive safety**: a deletion that would leave a hole or an empty
//!   archive is refused before either store is modified.

pub mod apply;
pub mod consistency;
pub mod engine;
pub mod model;
pub mod pipeline;

pub use apply::{apply, bootstrap_archive, delete_states, insert_states};
pub use consistency::check_consistency;
pub use engine::{find_divergence, reconcile, state_mismatches, FLOAT_TOLERANCE};
pub use model::{
    ApplyOutcome, ConsistencyReport, Divergence, Mismatch, Reconciliation, UpdateOutcome,
};
pub use pipeline::{update_states, UpdateOptions};
