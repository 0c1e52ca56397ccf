//! Content digests of state sequences
//!
//! ## Determinism Guarantees
//!
//! - Same states → same digest (canonical JSON serialization)
//! - Order-sensitive: reordering rows changes the digest

use crate::errors::Result;
use crate::model::State;
use sha2::{Digest, Sha256};

/// SHA256 of the canonical JSON form of `states`, hex encoded.
///
/// ## Example
///
/// ```
/// use cmdstates_core::digest::states_digest;
/// use cmdstates_core::model::default_state0;
///
/// let states = vec![default_state0().unwrap()];
/// let digest = states_digest(&states).unwrap();
/// assert_eq!(digest.len(), 64);
/// ```
///
/// ## Errors
///
/// Returns `StatesError::Serialization` if JSON serialization fails.
pub fn states_digest(states: &[State]) -> Result<String> {
    let canonical = serde_json::to_string(states)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
