use chrono::Utc;
use rusqlite::{params, Row};

use super::{DbError, MatchDb};
use crate::types::{Session, SessionStatus};

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    let status: String = row.get(2)?;
    Ok(Session {
        id: row.get(0)?,
        assignment_id: row.get(1)?,
        status: SessionStatus::parse(&status).unwrap_or(SessionStatus::Cancelled),
        scheduled_at: row.get(3)?,
        founder_rating: row.get(4)?,
        advisor_rating: row.get(5)?,
    })
}

impl MatchDb {
    // =========================================================================
    // Sessions
    // =========================================================================

    /// Insert a session row. The scheduling side of the platform owns
    /// session writes in production; this exists for ingestion and tests.
    pub fn insert_session(&self, session: &Session) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO sessions (id, assignment_id, status, scheduled_at,
                    founder_rating, advisor_rating, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.id,
                session.assignment_id,
                session.status.as_str(),
                session.scheduled_at,
                session.founder_rating,
                session.advisor_rating,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All sessions belonging to one assignment, oldest first.
    pub fn sessions_for_assignment(&self, assignment_id: &str) -> Result<Vec<Session>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, assignment_id, status, scheduled_at, founder_rating, advisor_rating
             FROM sessions
             WHERE assignment_id = ?1
             ORDER BY scheduled_at, id",
        )?;

        let rows = stmt.query_map(params![assignment_id], row_to_session)?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    /// Flip every `scheduled` session on the assignment to `cancelled`.
    /// Completed and already-cancelled sessions are untouched. Returns the
    /// number of sessions cancelled.
    pub fn cancel_scheduled_sessions(&self, assignment_id: &str) -> Result<usize, DbError> {
        let changed = self.conn.execute(
            "UPDATE sessions
             SET status = 'cancelled', updated_at = ?2
             WHERE assignment_id = ?1 AND status = 'scheduled'",
            params![assignment_id, Utc::now().to_rfc3339()],
        )?;
        Ok(changed)
    }
}
