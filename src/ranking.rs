//! Ranking engine: score a founder against an advisor pool and yield
//! candidates best-first.
//!
//! Ordering is descending by overall score with ties broken by advisor id
//! ascending, so repeated runs over an unchanged pool produce identical
//! sequences (bulk planning depends on this for idempotence).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::Serialize;

use crate::scorer::score;
use crate::types::{AdvisorCandidate, FounderFeatures, MatchScore};

/// One advisor with its computed score, as yielded by [`rank`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    pub advisor_id: String,
    pub score: MatchScore,
}

/// Max-heap ordering: higher overall wins, then lower advisor id.
struct HeapEntry(RankedCandidate);

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .score
            .overall
            .cmp(&other.0.score.overall)
            .then_with(|| other.0.advisor_id.cmp(&self.0.advisor_id))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

/// Lazy ranked sequence over an advisor pool.
///
/// Scores are computed once when the ranking is built; ordering is
/// materialized one candidate at a time as the iterator is consumed, so
/// taking a top-N prefix never sorts the whole pool.
pub struct Ranking {
    heap: BinaryHeap<HeapEntry>,
}

impl Ranking {
    /// Number of candidates remaining in the sequence.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Iterator for Ranking {
    type Item = RankedCandidate;

    fn next(&mut self) -> Option<RankedCandidate> {
        self.heap.pop().map(|entry| entry.0)
    }
}

/// Rank all eligible advisors for one founder.
///
/// Inactive and deleted advisors are filtered out before scoring. An empty
/// pool yields an empty sequence, not an error.
pub fn rank(founder: &FounderFeatures, pool: &[AdvisorCandidate]) -> Ranking {
    let heap = pool
        .iter()
        .filter(|a| a.active && !a.deleted)
        .map(|a| {
            HeapEntry(RankedCandidate {
                advisor_id: a.advisor_id.clone(),
                score: score(founder, &a.features),
            })
        })
        .collect();

    Ranking { heap }
}
