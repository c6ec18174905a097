use chrono::Utc;
use rusqlite::{params, Row};

use super::{DbError, MatchDb};
use crate::types::{Assignment, AssignmentStatus};

const ASSIGNMENT_COLUMNS: &str = "id, founder_id, advisor_id, status, match_score, assigned_by,
        assigned_at, completed_at, terminated_reason, notes,
        total_sessions, completed_sessions, avg_rating, updated_at";

fn row_to_assignment(row: &Row<'_>) -> rusqlite::Result<Assignment> {
    let status: String = row.get(3)?;
    Ok(Assignment {
        id: row.get(0)?,
        founder_id: row.get(1)?,
        advisor_id: row.get(2)?,
        status: AssignmentStatus::parse(&status).unwrap_or(AssignmentStatus::Terminated),
        match_score: row.get(4)?,
        assigned_by: row.get(5)?,
        assigned_at: row.get(6)?,
        completed_at: row.get(7)?,
        terminated_reason: row.get(8)?,
        notes: row.get(9)?,
        total_sessions: row.get(10)?,
        completed_sessions: row.get(11)?,
        avg_rating: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

impl MatchDb {
    // =========================================================================
    // Assignments
    // =========================================================================

    /// Look up a single assignment by its ID.
    pub fn get_assignment(&self, id: &str) -> Result<Option<Assignment>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = ?1"
        ))?;

        let mut rows = stmt.query_map(params![id], row_to_assignment)?;
        match rows.next() {
            Some(Ok(assignment)) => Ok(Some(assignment)),
            Some(Err(e)) => Err(DbError::Sqlite(e)),
            None => Ok(None),
        }
    }

    /// Whether the founder currently holds a pending or active assignment.
    ///
    /// Only meaningful as a pre-insert guard when called inside
    /// `with_transaction`.
    pub fn has_open_assignment(&self, founder_id: &str) -> Result<bool, DbError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM assignments
             WHERE founder_id = ?1 AND status IN ('pending', 'active')",
            params![founder_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn insert_assignment(&self, assignment: &Assignment) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO assignments (id, founder_id, advisor_id, status, match_score,
                    assigned_by, assigned_at, completed_at, terminated_reason, notes,
                    total_sessions, completed_sessions, avg_rating, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                assignment.id,
                assignment.founder_id,
                assignment.advisor_id,
                assignment.status.as_str(),
                assignment.match_score,
                assignment.assigned_by,
                assignment.assigned_at,
                assignment.completed_at,
                assignment.terminated_reason,
                assignment.notes,
                assignment.total_sessions,
                assignment.completed_sessions,
                assignment.avg_rating,
                assignment.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Flip an assignment's status, stamping `updated_at` and optionally the
    /// end-of-service fields. Returns the number of rows touched.
    pub fn update_assignment_status(
        &self,
        id: &str,
        status: AssignmentStatus,
        completed_at: Option<&str>,
        terminated_reason: Option<&str>,
    ) -> Result<usize, DbError> {
        let changed = self.conn.execute(
            "UPDATE assignments
             SET status = ?2,
                 completed_at = COALESCE(?3, completed_at),
                 terminated_reason = COALESCE(?4, terminated_reason),
                 updated_at = ?5
             WHERE id = ?1",
            params![
                id,
                status.as_str(),
                completed_at,
                terminated_reason,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(changed)
    }

    /// All assignments for a founder, newest first (audit history).
    pub fn list_assignments_by_founder(
        &self,
        founder_id: &str,
    ) -> Result<Vec<Assignment>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments
             WHERE founder_id = ?1
             ORDER BY assigned_at DESC, id"
        ))?;

        let rows = stmt.query_map(params![founder_id], row_to_assignment)?;
        let mut assignments = Vec::new();
        for row in rows {
            assignments.push(row?);
        }
        Ok(assignments)
    }

    /// Write recomputed session rollups back onto the assignment.
    pub fn update_assignment_rollups(
        &self,
        id: &str,
        total_sessions: u32,
        completed_sessions: u32,
        avg_rating: Option<f64>,
    ) -> Result<usize, DbError> {
        let changed = self.conn.execute(
            "UPDATE assignments
             SET total_sessions = ?2, completed_sessions = ?3, avg_rating = ?4,
                 updated_at = ?5
             WHERE id = ?1",
            params![
                id,
                total_sessions,
                completed_sessions,
                avg_rating,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(changed)
    }
}
