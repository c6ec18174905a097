//! Recalculation trigger: profile-change consumer and ranking cache.
//!
//! Rankings are cached per founder and invalidated only here, never by
//! display refresh cycles. Every event invalidates the rankings it
//! touches; a stale ranking must not outlive the change that obsoleted
//! it. Only the eager recomputation is debounced per user, so a burst of
//! edits collapses into one recalculation and later edits in the burst
//! leave the entry empty for the next read to fill. A founder change
//! re-ranks that founder eagerly; an advisor change can affect every
//! founder's ranking, so it only clears the cache and lets the next read
//! recompute lazily.
//!
//! Ranked results may go stale between recomputation and a human acting on
//! them; that is acceptable. The assignment invariant is enforced
//! elsewhere and never relies on this cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::MatchError;
use crate::ranking::RankedCandidate;
use crate::types::{ProfileChangeEvent, ProfileType};

/// Default window within which events for one user collapse.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Debounce-tracker entries older than this multiple of the window get
/// pruned so long-running consumers don't grow without bound.
const TRACKER_PRUNE_FACTOR: u32 = 10;
const TRACKER_PRUNE_THRESHOLD: usize = 1024;

struct CachedRanking {
    candidates: Vec<RankedCandidate>,
    computed_at: Instant,
}

/// Per-founder ranking cache with explicit invalidation.
pub struct RankingCache {
    entries: DashMap<String, CachedRanking>,
}

impl RankingCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, founder_id: &str) -> Option<Vec<RankedCandidate>> {
        self.entries
            .get(founder_id)
            .map(|entry| entry.candidates.clone())
    }

    /// Age of the cached ranking, if any. Diagnostics only.
    pub fn age(&self, founder_id: &str) -> Option<Duration> {
        self.entries
            .get(founder_id)
            .map(|entry| entry.computed_at.elapsed())
    }

    pub fn insert(&self, founder_id: &str, candidates: Vec<RankedCandidate>) {
        self.entries.insert(
            founder_id.to_string(),
            CachedRanking {
                candidates,
                computed_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, founder_id: &str) {
        self.entries.remove(founder_id);
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RankingCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Seam back into the ranking engine: assemble the founder's features and
/// the current advisor pool, run `rank`, return the materialized list.
#[async_trait]
pub trait RankProvider: Send + Sync {
    async fn rank_founder(&self, founder_id: &str) -> Result<Vec<RankedCandidate>, MatchError>;
}

/// Cached read path: serve from the cache, or recompute and fill it.
pub async fn ranked_candidates(
    cache: &RankingCache,
    provider: &dyn RankProvider,
    founder_id: &str,
) -> Result<Vec<RankedCandidate>, MatchError> {
    if let Some(hit) = cache.get(founder_id) {
        return Ok(hit);
    }
    let ranked = provider.rank_founder(founder_id).await?;
    cache.insert(founder_id, ranked.clone());
    Ok(ranked)
}

/// Start the profile-change consumer.
///
/// Runs until the event channel closes. Every event invalidates the
/// affected cache entries; the eager re-rank is skipped for events
/// arriving inside the same user's debounce window, leaving the entry to
/// the next lazy read.
pub fn spawn_recalc_consumer(
    cache: Arc<RankingCache>,
    provider: Arc<dyn RankProvider>,
    mut events: mpsc::Receiver<ProfileChangeEvent>,
    debounce: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        log::info!("Recalc: consumer started (debounce {:?})", debounce);
        let mut last_reranked: HashMap<String, Instant> = HashMap::new();

        while let Some(event) = events.recv().await {
            invalidate_for(&cache, &event);

            if let Some(last) = last_reranked.get(&event.user_id) {
                if last.elapsed() < debounce {
                    log::debug!("Recalc: debounced re-rank for {}", event.user_id);
                    continue;
                }
            }
            last_reranked.insert(event.user_id.clone(), Instant::now());

            if event.profile_type == ProfileType::Founder {
                rerank_founder(&cache, provider.as_ref(), &event.user_id).await;
            }

            if last_reranked.len() > TRACKER_PRUNE_THRESHOLD {
                let horizon = debounce * TRACKER_PRUNE_FACTOR;
                last_reranked.retain(|_, t| t.elapsed() < horizon);
            }
        }

        log::info!("Recalc: consumer stopped");
    })
}

/// Invalidation is never debounced.
fn invalidate_for(cache: &RankingCache, event: &ProfileChangeEvent) {
    match event.profile_type {
        ProfileType::Founder => cache.invalidate(&event.user_id),
        ProfileType::Advisor => {
            // An advisor edit can shift every founder's ranking. Clearing
            // the cache bounds the cost; recomputation happens on the next
            // read per founder.
            let dropped = cache.len();
            cache.invalidate_all();
            log::debug!(
                "Recalc: advisor {} changed, dropped {} cached rankings",
                event.user_id,
                dropped
            );
        }
    }
}

async fn rerank_founder(cache: &RankingCache, provider: &dyn RankProvider, founder_id: &str) {
    match provider.rank_founder(founder_id).await {
        Ok(ranked) => {
            log::debug!(
                "Recalc: re-ranked founder {} ({} candidates)",
                founder_id,
                ranked.len()
            );
            cache.insert(founder_id, ranked);
        }
        Err(e) => {
            // Leave the entry invalidated; the next read recomputes.
            log::warn!("Recalc: re-rank failed for {}: {}", founder_id, e);
        }
    }
}
