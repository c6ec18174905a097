//! Assignment lifecycle manager.
//!
//! Sole owner of assignment mutations. States run pending -> active ->
//! completed, with terminated reachable from pending and active.
//! The one-open-assignment-per-founder invariant is enforced by running
//! the duplicate check and the insert inside a single `BEGIN IMMEDIATE`
//! transaction, so two concurrent creates for the same founder cannot
//! both pass the check.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::db::MatchDb;
use crate::error::MatchError;
use crate::stores::{LogNotifier, NotificationSink};
use crate::types::{
    Assignment, AssignmentStatus, BulkCreateOutcome, MatchScore, ProposedAssignment,
};

pub struct Lifecycle {
    db: Arc<Mutex<MatchDb>>,
    notifier: Arc<dyn NotificationSink>,
}

impl Lifecycle {
    pub fn new(db: Arc<Mutex<MatchDb>>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { db, notifier }
    }

    /// Lifecycle manager that only logs its notifications.
    pub fn with_logging(db: Arc<Mutex<MatchDb>>) -> Self {
        Self::new(db, Arc::new(LogNotifier))
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Create a pending assignment.
    ///
    /// Fails with `DuplicateActiveAssignment` when the founder already
    /// holds a pending or active assignment. Check and insert are atomic.
    pub fn create(
        &self,
        founder_id: &str,
        advisor_id: &str,
        score: &MatchScore,
        assigned_by: &str,
        notes: Option<String>,
    ) -> Result<Assignment, MatchError> {
        let assignment = {
            let db = self.db.lock();
            db.with_transaction(|db| {
                if db.has_open_assignment(founder_id)? {
                    return Err(MatchError::DuplicateActiveAssignment {
                        founder_id: founder_id.to_string(),
                    });
                }

                let now = Utc::now().to_rfc3339();
                let assignment = Assignment {
                    id: Uuid::new_v4().to_string(),
                    founder_id: founder_id.to_string(),
                    advisor_id: advisor_id.to_string(),
                    status: AssignmentStatus::Pending,
                    match_score: score.overall,
                    assigned_by: assigned_by.to_string(),
                    assigned_at: now.clone(),
                    completed_at: None,
                    terminated_reason: None,
                    notes,
                    total_sessions: 0,
                    completed_sessions: 0,
                    avg_rating: None,
                    updated_at: now,
                };
                db.insert_assignment(&assignment)?;
                Ok(assignment)
            })?
        };

        log::info!(
            "Lifecycle: created assignment {} (founder {}, advisor {}, score {})",
            assignment.id,
            founder_id,
            advisor_id,
            score.overall
        );
        self.notifier.assignment_created(&assignment);
        Ok(assignment)
    }

    /// pending -> active. Idempotent when already active.
    pub fn activate(&self, id: &str) -> Result<Assignment, MatchError> {
        let db = self.db.lock();
        db.with_transaction(|db| {
            let mut assignment = get_required(db, id)?;
            match assignment.status {
                AssignmentStatus::Active => Ok(assignment),
                AssignmentStatus::Pending => {
                    db.update_assignment_status(id, AssignmentStatus::Active, None, None)?;
                    assignment.status = AssignmentStatus::Active;
                    Ok(assignment)
                }
                from => Err(MatchError::InvalidTransition {
                    from,
                    to: AssignmentStatus::Active,
                }),
            }
        })
    }

    /// active -> completed. Driven by external program-completion logic.
    pub fn complete(&self, id: &str) -> Result<Assignment, MatchError> {
        let db = self.db.lock();
        db.with_transaction(|db| {
            let mut assignment = get_required(db, id)?;
            if assignment.status != AssignmentStatus::Active {
                return Err(MatchError::InvalidTransition {
                    from: assignment.status,
                    to: AssignmentStatus::Completed,
                });
            }

            let now = Utc::now().to_rfc3339();
            db.update_assignment_status(id, AssignmentStatus::Completed, Some(&now), None)?;
            assignment.status = AssignmentStatus::Completed;
            assignment.completed_at = Some(now);
            Ok(assignment)
        })
    }

    /// pending/active -> terminated. Irreversible.
    ///
    /// Every scheduled session on the assignment is cancelled in the same
    /// transaction as the status flip; completed sessions keep their
    /// history.
    pub fn terminate(
        &self,
        id: &str,
        reason: &str,
        effective_date: Option<&str>,
    ) -> Result<Assignment, MatchError> {
        let (assignment, cancelled) = {
            let db = self.db.lock();
            db.with_transaction(|db| {
                let mut assignment = get_required(db, id)?;
                if assignment.status.is_terminal() {
                    return Err(MatchError::InvalidTransition {
                        from: assignment.status,
                        to: AssignmentStatus::Terminated,
                    });
                }

                let now = Utc::now().to_rfc3339();
                let effective = effective_date.unwrap_or(&now);
                db.update_assignment_status(
                    id,
                    AssignmentStatus::Terminated,
                    Some(effective),
                    Some(reason),
                )?;
                let cancelled = db.cancel_scheduled_sessions(id)?;

                assignment.status = AssignmentStatus::Terminated;
                assignment.completed_at = Some(effective.to_string());
                assignment.terminated_reason = Some(reason.to_string());
                Ok((assignment, cancelled))
            })?
        };

        log::info!(
            "Lifecycle: terminated assignment {} ({} scheduled sessions cancelled)",
            id,
            cancelled
        );
        self.notifier.assignment_terminated(&assignment, reason);
        Ok(assignment)
    }

    // =========================================================================
    // Bulk creation
    // =========================================================================

    /// Create assignments from planner proposals with partial success.
    ///
    /// Each proposal gets the same duplicate check as `create`; one
    /// rejected proposal never aborts the batch. Outcomes come back in
    /// input order. A proposal whose founder was already served earlier in
    /// the same batch is skipped as a duplicate.
    pub fn bulk_create(
        &self,
        proposals: &[ProposedAssignment],
        assigned_by: &str,
    ) -> Vec<BulkCreateOutcome> {
        let mut outcomes = Vec::with_capacity(proposals.len());

        for proposal in proposals {
            let outcome = match self.create(
                &proposal.founder_id,
                &proposal.advisor_id,
                &proposal.score,
                assigned_by,
                None,
            ) {
                Ok(assignment) => BulkCreateOutcome::Created {
                    founder_id: proposal.founder_id.clone(),
                    assignment_id: assignment.id,
                },
                Err(MatchError::DuplicateActiveAssignment { .. }) => {
                    BulkCreateOutcome::SkippedDuplicate {
                        founder_id: proposal.founder_id.clone(),
                    }
                }
                Err(e) => {
                    log::warn!(
                        "Lifecycle: bulk create failed for founder {}: {}",
                        proposal.founder_id,
                        e
                    );
                    BulkCreateOutcome::Failed {
                        founder_id: proposal.founder_id.clone(),
                        message: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let created = outcomes
            .iter()
            .filter(|o| matches!(o, BulkCreateOutcome::Created { .. }))
            .count();
        log::info!(
            "Lifecycle: bulk create finished ({} created, {} skipped/failed)",
            created,
            outcomes.len() - created
        );
        outcomes
    }
}

fn get_required(db: &MatchDb, id: &str) -> Result<Assignment, MatchError> {
    db.get_assignment(id)?.ok_or_else(|| MatchError::NotFound {
        kind: "assignment",
        id: id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Session, SessionStatus};
    use std::sync::Mutex as StdMutex;

    fn score(overall: u8) -> MatchScore {
        MatchScore {
            overall,
            sector_score: 0,
            stage_score: 0,
            expertise_score: 0,
            timezone_score: 0,
        }
    }

    fn lifecycle() -> (Lifecycle, Arc<Mutex<MatchDb>>) {
        let db = Arc::new(Mutex::new(MatchDb::open_in_memory().unwrap()));
        (Lifecycle::with_logging(db.clone()), db)
    }

    fn proposal(founder_id: &str, advisor_id: &str) -> ProposedAssignment {
        ProposedAssignment {
            founder_id: founder_id.to_string(),
            advisor_id: advisor_id.to_string(),
            score: score(85),
        }
    }

    #[test]
    fn create_rejects_duplicate_open_assignment() {
        let (lifecycle, _db) = lifecycle();
        lifecycle
            .create("f1", "a1", &score(85), "admin", None)
            .unwrap();

        let err = lifecycle
            .create("f1", "a2", &score(90), "admin", None)
            .unwrap_err();
        assert!(matches!(err, MatchError::DuplicateActiveAssignment { .. }));
    }

    #[test]
    fn terminated_founder_can_be_reassigned() {
        let (lifecycle, db) = lifecycle();
        let first = lifecycle
            .create("f1", "a1", &score(85), "admin", None)
            .unwrap();
        lifecycle.terminate(&first.id, "advisor left", None).unwrap();

        let second = lifecycle
            .create("f1", "a2", &score(70), "admin", None)
            .unwrap();
        assert_eq!(second.status, AssignmentStatus::Pending);

        // Both rows survive as audit history.
        let history = db.lock().list_assignments_by_founder("f1").unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn invariant_holds_across_transition_sequences() {
        let (lifecycle, db) = lifecycle();

        let a = lifecycle
            .create("f1", "a1", &score(85), "admin", None)
            .unwrap();
        lifecycle.activate(&a.id).unwrap();
        lifecycle.complete(&a.id).unwrap();

        let b = lifecycle
            .create("f1", "a2", &score(75), "admin", None)
            .unwrap();
        lifecycle.activate(&b.id).unwrap();
        lifecycle.terminate(&b.id, "program ended", None).unwrap();

        lifecycle
            .create("f1", "a3", &score(65), "admin", None)
            .unwrap();

        let open = db
            .lock()
            .list_assignments_by_founder("f1")
            .unwrap()
            .into_iter()
            .filter(|a| a.status.is_open())
            .count();
        assert_eq!(open, 1);
    }

    #[test]
    fn activate_is_idempotent() {
        let (lifecycle, _db) = lifecycle();
        let a = lifecycle
            .create("f1", "a1", &score(85), "admin", None)
            .unwrap();

        lifecycle.activate(&a.id).unwrap();
        let again = lifecycle.activate(&a.id).unwrap();
        assert_eq!(again.status, AssignmentStatus::Active);
    }

    #[test]
    fn completing_a_pending_assignment_is_invalid() {
        let (lifecycle, _db) = lifecycle();
        let a = lifecycle
            .create("f1", "a1", &score(85), "admin", None)
            .unwrap();

        let err = lifecycle.complete(&a.id).unwrap_err();
        assert!(matches!(
            err,
            MatchError::InvalidTransition {
                from: AssignmentStatus::Pending,
                to: AssignmentStatus::Completed,
            }
        ));
    }

    #[test]
    fn terminal_assignments_reject_further_transitions() {
        let (lifecycle, _db) = lifecycle();
        let a = lifecycle
            .create("f1", "a1", &score(85), "admin", None)
            .unwrap();
        lifecycle.terminate(&a.id, "withdrew", None).unwrap();

        assert!(lifecycle.activate(&a.id).is_err());
        assert!(lifecycle.terminate(&a.id, "again", None).is_err());
    }

    #[test]
    fn unknown_assignment_is_not_found() {
        let (lifecycle, _db) = lifecycle();
        let err = lifecycle.activate("nope").unwrap_err();
        assert!(matches!(err, MatchError::NotFound { .. }));
    }

    #[test]
    fn terminate_cascades_to_scheduled_sessions_only() {
        let (lifecycle, db) = lifecycle();
        let a = lifecycle
            .create("f1", "a1", &score(85), "admin", None)
            .unwrap();
        lifecycle.activate(&a.id).unwrap();

        {
            let db = db.lock();
            for i in 0..3 {
                db.insert_session(&Session {
                    id: format!("s-sched-{i}"),
                    assignment_id: a.id.clone(),
                    status: SessionStatus::Scheduled,
                    scheduled_at: None,
                    founder_rating: None,
                    advisor_rating: None,
                })
                .unwrap();
            }
            for i in 0..2 {
                db.insert_session(&Session {
                    id: format!("s-done-{i}"),
                    assignment_id: a.id.clone(),
                    status: SessionStatus::Completed,
                    scheduled_at: None,
                    founder_rating: Some(4),
                    advisor_rating: Some(5),
                })
                .unwrap();
            }
        }

        lifecycle.terminate(&a.id, "mismatch", None).unwrap();

        let sessions = db.lock().sessions_for_assignment(&a.id).unwrap();
        let cancelled = sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Cancelled)
            .count();
        let completed = sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Completed)
            .count();
        assert_eq!(cancelled, 3);
        assert_eq!(completed, 2);
    }

    #[test]
    fn bulk_create_partially_succeeds() {
        let (lifecycle, _db) = lifecycle();

        // f2 and f4 already hold open assignments.
        lifecycle
            .create("f2", "a9", &score(80), "admin", None)
            .unwrap();
        lifecycle
            .create("f4", "a9", &score(80), "admin", None)
            .unwrap();

        let proposals = vec![
            proposal("f1", "a1"),
            proposal("f2", "a1"),
            proposal("f3", "a2"),
            proposal("f4", "a2"),
            proposal("f5", "a3"),
        ];

        let outcomes = lifecycle.bulk_create(&proposals, "planner");
        assert_eq!(outcomes.len(), 5);

        let created = outcomes
            .iter()
            .filter(|o| matches!(o, BulkCreateOutcome::Created { .. }))
            .count();
        let skipped = outcomes
            .iter()
            .filter(|o| matches!(o, BulkCreateOutcome::SkippedDuplicate { .. }))
            .count();
        assert_eq!(created, 3);
        assert_eq!(skipped, 2);
        assert!(matches!(
            outcomes[1],
            BulkCreateOutcome::SkippedDuplicate { .. }
        ));
    }

    #[test]
    fn bulk_create_skips_repeat_founder_within_batch() {
        let (lifecycle, _db) = lifecycle();
        let proposals = vec![proposal("f1", "a1"), proposal("f1", "a2")];

        let outcomes = lifecycle.bulk_create(&proposals, "planner");
        assert!(matches!(outcomes[0], BulkCreateOutcome::Created { .. }));
        assert!(matches!(
            outcomes[1],
            BulkCreateOutcome::SkippedDuplicate { .. }
        ));
    }

    struct RecordingSink {
        events: StdMutex<Vec<String>>,
    }

    impl NotificationSink for RecordingSink {
        fn assignment_created(&self, assignment: &Assignment) {
            self.events
                .lock()
                .unwrap()
                .push(format!("created:{}", assignment.founder_id));
        }

        fn assignment_terminated(&self, assignment: &Assignment, reason: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("terminated:{}:{}", assignment.founder_id, reason));
        }
    }

    #[test]
    fn notifications_fire_on_create_and_terminate() {
        let db = Arc::new(Mutex::new(MatchDb::open_in_memory().unwrap()));
        let sink = Arc::new(RecordingSink {
            events: StdMutex::new(Vec::new()),
        });
        let lifecycle = Lifecycle::new(db, sink.clone());

        let a = lifecycle
            .create("f1", "a1", &score(85), "admin", None)
            .unwrap();
        lifecycle.terminate(&a.id, "no fit", None).unwrap();

        let events = sink.events.lock().unwrap();
        assert_eq!(
            *events,
            vec!["created:f1".to_string(), "terminated:f1:no fit".to_string()]
        );
    }
}
