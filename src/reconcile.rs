//! Metrics reconciler: recompute assignment rollups from session ground
//! truth and flag drift.
//!
//! `reconcile` is strictly read-only, which makes it idempotent by
//! construction; drift is the designed outcome of an integrity audit, not
//! an error. Writing corrected values back is a separate explicit
//! [`repair`] step.
//!
//! Rating aggregation: a completed session contributes the average of the
//! ratings that exist. A session rated by only one side contributes that
//! single rating; a completed session with no ratings is excluded from
//! both numerator and denominator. (The historical behavior of counting a
//! missing rating as zero deflated averages and is deliberately not kept.)

use crate::db::MatchDb;
use crate::error::MatchError;
use crate::types::{ReconciliationReport, Session, SessionStatus};

/// Tolerance for comparing a recomputed mean against the stored REAL.
const RATING_EPSILON: f64 = 1e-6;

/// Recompute rollups for one assignment and compare against stored values.
pub fn reconcile(db: &MatchDb, assignment_id: &str) -> Result<ReconciliationReport, MatchError> {
    let assignment = db
        .get_assignment(assignment_id)?
        .ok_or_else(|| MatchError::NotFound {
            kind: "assignment",
            id: assignment_id.to_string(),
        })?;

    let sessions = db.sessions_for_assignment(assignment_id)?;

    let computed_total = sessions.len() as u32;
    let completed: Vec<&Session> = sessions
        .iter()
        .filter(|s| s.status == SessionStatus::Completed)
        .collect();
    let computed_completed = completed.len() as u32;

    let mut sum = 0.0;
    let mut rated = 0u32;
    for session in &completed {
        if let Some(rating) = session_rating(session) {
            sum += rating;
            rated += 1;
        }
    }
    let computed_avg = if rated > 0 {
        Some(sum / rated as f64)
    } else {
        None
    };

    let report = ReconciliationReport {
        assignment_id: assignment_id.to_string(),
        stored_total_sessions: assignment.total_sessions,
        computed_total_sessions: computed_total,
        stored_completed_sessions: assignment.completed_sessions,
        computed_completed_sessions: computed_completed,
        stored_avg_rating: assignment.avg_rating,
        computed_avg_rating: computed_avg,
        total_sessions_drift: assignment.total_sessions != computed_total,
        completed_sessions_drift: assignment.completed_sessions != computed_completed,
        avg_rating_drift: ratings_differ(assignment.avg_rating, computed_avg),
    };

    if report.has_drift() {
        log::warn!(
            "Reconcile: drift on assignment {} (total {}->{}, completed {}->{}, rating {:?}->{:?})",
            assignment_id,
            report.stored_total_sessions,
            report.computed_total_sessions,
            report.stored_completed_sessions,
            report.computed_completed_sessions,
            report.stored_avg_rating,
            report.computed_avg_rating
        );
    }
    Ok(report)
}

/// Write the recomputed rollups back onto the assignment. Returns whether
/// anything was written; a drift-free report is a no-op.
pub fn repair(db: &MatchDb, report: &ReconciliationReport) -> Result<bool, MatchError> {
    if !report.has_drift() {
        return Ok(false);
    }

    let changed = db.update_assignment_rollups(
        &report.assignment_id,
        report.computed_total_sessions,
        report.computed_completed_sessions,
        report.computed_avg_rating,
    )?;
    if changed == 0 {
        return Err(MatchError::NotFound {
            kind: "assignment",
            id: report.assignment_id.clone(),
        });
    }

    log::info!("Reconcile: repaired rollups on assignment {}", report.assignment_id);
    Ok(true)
}

fn session_rating(session: &Session) -> Option<f64> {
    match (session.founder_rating, session.advisor_rating) {
        (Some(f), Some(a)) => Some((f as f64 + a as f64) / 2.0),
        (Some(f), None) => Some(f as f64),
        (None, Some(a)) => Some(a as f64),
        (None, None) => None,
    }
}

fn ratings_differ(stored: Option<f64>, computed: Option<f64>) -> bool {
    match (stored, computed) {
        (Some(s), Some(c)) => (s - c).abs() > RATING_EPSILON,
        (None, None) => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Assignment, AssignmentStatus};

    fn seed(db: &MatchDb, total: u32, completed: u32, avg: Option<f64>) -> String {
        let id = "as-1".to_string();
        db.insert_assignment(&Assignment {
            id: id.clone(),
            founder_id: "f1".to_string(),
            advisor_id: "a1".to_string(),
            status: AssignmentStatus::Active,
            match_score: 80,
            assigned_by: "admin".to_string(),
            assigned_at: "2026-03-01T09:00:00Z".to_string(),
            completed_at: None,
            terminated_reason: None,
            notes: None,
            total_sessions: total,
            completed_sessions: completed,
            avg_rating: avg,
            updated_at: "2026-03-01T09:00:00Z".to_string(),
        })
        .unwrap();
        id
    }

    fn add_session(
        db: &MatchDb,
        id: &str,
        status: SessionStatus,
        founder_rating: Option<u8>,
        advisor_rating: Option<u8>,
    ) {
        db.insert_session(&Session {
            id: id.to_string(),
            assignment_id: "as-1".to_string(),
            status,
            scheduled_at: None,
            founder_rating,
            advisor_rating,
        })
        .unwrap();
    }

    #[test]
    fn clean_assignment_reports_no_drift() {
        let db = MatchDb::open_in_memory().unwrap();
        let id = seed(&db, 2, 1, Some(4.5));
        add_session(&db, "s1", SessionStatus::Completed, Some(4), Some(5));
        add_session(&db, "s2", SessionStatus::Scheduled, None, None);

        let report = reconcile(&db, &id).unwrap();
        assert!(!report.has_drift());
        assert_eq!(report.computed_avg_rating, Some(4.5));
    }

    #[test]
    fn stale_rollups_are_flagged() {
        let db = MatchDb::open_in_memory().unwrap();
        let id = seed(&db, 0, 0, None);
        add_session(&db, "s1", SessionStatus::Completed, Some(3), Some(5));
        add_session(&db, "s2", SessionStatus::Cancelled, None, None);

        let report = reconcile(&db, &id).unwrap();
        assert!(report.total_sessions_drift);
        assert!(report.completed_sessions_drift);
        assert!(report.avg_rating_drift);
        assert_eq!(report.computed_total_sessions, 2);
        assert_eq!(report.computed_completed_sessions, 1);
        assert_eq!(report.computed_avg_rating, Some(4.0));
    }

    #[test]
    fn reconcile_is_idempotent_and_read_only() {
        let db = MatchDb::open_in_memory().unwrap();
        let id = seed(&db, 7, 7, Some(1.0));
        add_session(&db, "s1", SessionStatus::Completed, Some(4), Some(4));

        let first = reconcile(&db, &id).unwrap();
        let second = reconcile(&db, &id).unwrap();
        assert_eq!(first, second);

        // Stored values untouched despite drift.
        let stored = db.get_assignment(&id).unwrap().unwrap();
        assert_eq!(stored.total_sessions, 7);
        assert_eq!(stored.avg_rating, Some(1.0));
    }

    #[test]
    fn one_sided_ratings_count_alone_and_unrated_are_excluded() {
        let db = MatchDb::open_in_memory().unwrap();
        let id = seed(&db, 3, 3, None);
        add_session(&db, "s1", SessionStatus::Completed, Some(5), None);
        add_session(&db, "s2", SessionStatus::Completed, None, Some(3));
        add_session(&db, "s3", SessionStatus::Completed, None, None);

        let report = reconcile(&db, &id).unwrap();
        // (5 + 3) / 2 rated sessions; the unrated one contributes nothing.
        assert_eq!(report.computed_avg_rating, Some(4.0));
    }

    #[test]
    fn scheduled_and_cancelled_sessions_never_rate() {
        let db = MatchDb::open_in_memory().unwrap();
        let id = seed(&db, 2, 0, None);
        add_session(&db, "s1", SessionStatus::Scheduled, Some(5), Some(5));
        add_session(&db, "s2", SessionStatus::Cancelled, Some(5), Some(5));

        let report = reconcile(&db, &id).unwrap();
        assert_eq!(report.computed_avg_rating, None);
        assert!(!report.has_drift());
    }

    #[test]
    fn repair_writes_computed_values_once() {
        let db = MatchDb::open_in_memory().unwrap();
        let id = seed(&db, 0, 0, None);
        add_session(&db, "s1", SessionStatus::Completed, Some(4), Some(2));

        let report = reconcile(&db, &id).unwrap();
        assert!(repair(&db, &report).unwrap());

        let after = reconcile(&db, &id).unwrap();
        assert!(!after.has_drift());
        assert!(!repair(&db, &after).unwrap());

        let stored = db.get_assignment(&id).unwrap().unwrap();
        assert_eq!(stored.total_sessions, 1);
        assert_eq!(stored.completed_sessions, 1);
        assert_eq!(stored.avg_rating, Some(3.0));
    }

    #[test]
    fn unknown_assignment_is_not_found() {
        let db = MatchDb::open_in_memory().unwrap();
        let err = reconcile(&db, "missing").unwrap_err();
        assert!(matches!(err, MatchError::NotFound { .. }));
    }
}
