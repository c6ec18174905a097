//! Seams to the surrounding platform: profile fetch and notification
//! dispatch.
//!
//! The engine consumes these, it never reimplements them. Profile fetches
//! go over the wire somewhere behind the trait, so every call carries a
//! per-attempt timeout and transient failures are retried with bounded
//! exponential backoff; exhaustion reports an error instead of hanging.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::MatchError;
use crate::types::{Assignment, ProfileType};

/// Read-only access to the external profile store.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch_profile(
        &self,
        user_id: &str,
        profile_type: ProfileType,
    ) -> Result<Value, MatchError>;
}

/// Fire-and-forget notification dispatch on lifecycle events. The sink
/// formats and sends; the engine only announces.
pub trait NotificationSink: Send + Sync {
    fn assignment_created(&self, assignment: &Assignment);
    fn assignment_terminated(&self, assignment: &Assignment, reason: &str);
}

/// Default sink: log and move on.
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn assignment_created(&self, assignment: &Assignment) {
        log::info!(
            "Notify: assignment {} created (founder {}, advisor {})",
            assignment.id,
            assignment.founder_id,
            assignment.advisor_id
        );
    }

    fn assignment_terminated(&self, assignment: &Assignment, reason: &str) {
        log::info!(
            "Notify: assignment {} terminated ({})",
            assignment.id,
            reason
        );
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Timeout applied to each individual fetch attempt.
    pub attempt_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
            attempt_timeout_ms: 10_000,
        }
    }
}

fn retry_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    let exponent = 2u64.saturating_pow(attempt.saturating_sub(1));
    let base = policy
        .initial_backoff_ms
        .saturating_mul(exponent)
        .min(policy.max_backoff_ms);
    let jitter = (std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0))
        % 150;
    Duration::from_millis(base.saturating_add(jitter))
}

/// Fetch a profile, retrying transient failures with backoff.
///
/// Non-retryable errors (unknown user, bad payload) propagate immediately;
/// timeouts count as transient. After exhaustion the last error is
/// reported and no state has changed.
pub async fn fetch_profile_with_retry(
    store: &dyn ProfileStore,
    user_id: &str,
    profile_type: ProfileType,
    policy: &RetryPolicy,
) -> Result<Value, MatchError> {
    let attempts = policy.max_attempts.max(1);
    let mut last_err =
        MatchError::StoreUnavailable(format!("profile fetch for {user_id} never attempted"));

    for attempt in 1..=attempts {
        let fetch = store.fetch_profile(user_id, profile_type);
        let result =
            tokio::time::timeout(Duration::from_millis(policy.attempt_timeout_ms), fetch).await;

        let err = match result {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) if !e.is_retryable() => return Err(e),
            Ok(Err(e)) => e,
            Err(_) => MatchError::StoreUnavailable(format!(
                "profile fetch for {user_id} timed out after {}ms",
                policy.attempt_timeout_ms
            )),
        };

        if attempt < attempts {
            let delay = retry_delay(attempt, policy);
            log::warn!(
                "ProfileStore: retry {}/{} for {}: {} (sleep {:?})",
                attempt,
                attempts,
                user_id,
                err,
                delay
            );
            tokio::time::sleep(delay).await;
        }
        last_err = err;
    }

    Err(last_err)
}
