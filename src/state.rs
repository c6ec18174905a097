//! Shared engine state wiring.
//!
//! One `EngineState` per process: the store behind its mutex, the ranking
//! cache, and the lifecycle manager bound to both. Request handlers and
//! background tasks all hang off this.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::db::{DbError, MatchDb};
use crate::lifecycle::Lifecycle;
use crate::recalc::RankingCache;
use crate::stores::{LogNotifier, NotificationSink};

pub struct EngineState {
    pub db: Arc<Mutex<MatchDb>>,
    pub ranking_cache: Arc<RankingCache>,
    pub lifecycle: Lifecycle,
}

impl EngineState {
    pub fn new(db: MatchDb, notifier: Arc<dyn NotificationSink>) -> Self {
        let db = Arc::new(Mutex::new(db));
        Self {
            db: db.clone(),
            ranking_cache: Arc::new(RankingCache::new()),
            lifecycle: Lifecycle::new(db, notifier),
        }
    }

    /// Open the default on-disk store with log-only notifications.
    pub fn open_default() -> Result<Self, DbError> {
        Ok(Self::new(MatchDb::open()?, Arc::new(LogNotifier)))
    }
}
