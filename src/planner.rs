//! Bulk assignment planner: one greedy proposal per founder under a score
//! threshold.
//!
//! Founders are processed in the caller-supplied order and never re-sorted;
//! a stable input order plus the ranking engine's deterministic tie-break
//! makes a planning pass reproducible.

use std::collections::HashSet;

use crate::ranking::rank;
use crate::types::{AdvisorCandidate, FounderFeatures, ProposedAssignment};

/// Whether an advisor can be proposed to more than one founder within a
/// single planning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapacityPolicy {
    /// An advisor may be proposed to any number of founders in one pass.
    /// This is the default and matches the historical planner behavior;
    /// operators review proposals before they become assignments.
    #[default]
    Unconstrained,
    /// Once proposed, an advisor is removed from the pool for the rest of
    /// the pass; later founders fall through to their next-best candidate.
    ReserveOncePerBatch,
}

/// Propose at most one assignment per founder.
///
/// For each founder the top-ranked eligible advisor is proposed iff its
/// overall score clears `threshold`; founders with no clearing candidate
/// are skipped silently.
pub fn plan(
    founders: &[(String, FounderFeatures)],
    pool: &[AdvisorCandidate],
    threshold: u8,
    policy: CapacityPolicy,
) -> Vec<ProposedAssignment> {
    let mut reserved: HashSet<String> = HashSet::new();
    let mut proposals = Vec::new();

    for (founder_id, features) in founders {
        let candidate = match policy {
            CapacityPolicy::Unconstrained => rank(features, pool).next(),
            CapacityPolicy::ReserveOncePerBatch => {
                rank(features, pool).find(|c| !reserved.contains(&c.advisor_id))
            }
        };

        let Some(candidate) = candidate else {
            log::debug!("Planner: no eligible advisors for founder {founder_id}");
            continue;
        };

        if candidate.score.overall < threshold {
            log::debug!(
                "Planner: best candidate for {} scored {} (< {}), skipping",
                founder_id,
                candidate.score.overall,
                threshold
            );
            continue;
        }

        if policy == CapacityPolicy::ReserveOncePerBatch {
            reserved.insert(candidate.advisor_id.clone());
        }

        proposals.push(ProposedAssignment {
            founder_id: founder_id.clone(),
            advisor_id: candidate.advisor_id,
            score: candidate.score,
        });
    }

    log::info!(
        "Planner: proposed {} of {} founders (threshold {})",
        proposals.len(),
        founders.len(),
        threshold
    );
    proposals
}
