//! Error types for matching and assignment operations.
//!
//! Pure computation (scoring, ranking) never raises domain errors; absent
//! data degrades scores instead. Everything that touches a store can fail,
//! and failures are classified by recoverability so callers know whether a
//! retry is worth it.

use thiserror::Error;

use crate::db::DbError;
use crate::types::AssignmentStatus;

#[derive(Debug, Error)]
pub enum MatchError {
    /// The profile payload carried none of the fields the role needs.
    #[error("Incomplete profile: {reason}")]
    IncompleteProfile { reason: String },

    /// The founder already holds a pending or active assignment.
    #[error("Founder {founder_id} already has a pending or active assignment")]
    DuplicateActiveAssignment { founder_id: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: AssignmentStatus,
        to: AssignmentStatus,
    },

    /// Transient infrastructure failure, worth retrying with backoff.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error(transparent)]
    Store(#[from] DbError),
}

impl MatchError {
    /// Returns true if retrying the operation could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            MatchError::StoreUnavailable(_) => true,
            MatchError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}
