//! Matching and assignment core for a mentorship operations platform.
//!
//! Pairs founders with advisors: normalizes heterogeneous profile payloads
//! into comparable feature sets, scores compatibility, ranks candidate
//! advisors deterministically, plans bulk assignments under a score
//! threshold, enforces the one-open-assignment-per-founder invariant
//! through an owned lifecycle manager, reconciles derived session metrics
//! against ground truth, and reacts to profile changes through a debounced
//! recalculation consumer.
//!
//! Consumed as a library by the surrounding platform (admin tools, forms);
//! UI, auth, file storage, and email live behind the seams in [`stores`].

pub mod db;
pub mod error;
pub mod lifecycle;
pub mod normalizer;
pub mod planner;
pub mod ranking;
pub mod recalc;
pub mod reconcile;
pub mod scorer;
pub mod state;
pub mod stores;
pub mod types;

pub use error::MatchError;
pub use state::EngineState;
