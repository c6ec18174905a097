//! Domain types shared across the matching and assignment engine.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Profiles and features
// ============================================================================

/// Which side of a pairing a profile belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    Founder,
    Advisor,
}

/// Normalized founder profile used for scoring.
///
/// Immutable for the duration of a scoring pass; recomputed from the raw
/// profile whenever the source mutates. Free-text fields are display-only
/// and never scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FounderFeatures {
    pub sector: String,
    pub stage: String,
    /// Challenge tags the founder wants help with, canonicalized to
    /// lowercase. Empty set when the profile declares none.
    pub challenges: BTreeSet<String>,
    pub timezone: String,
    pub display_name: Option<String>,
}

/// Normalized advisor profile used for scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorFeatures {
    pub sector: String,
    /// Company stages the advisor covers, canonicalized to lowercase.
    pub stage_focus: BTreeSet<String>,
    /// Expertise tags, canonicalized to lowercase.
    pub expertise: BTreeSet<String>,
    pub timezone: String,
    pub display_name: Option<String>,
}

/// One advisor in a ranking pool. Inactive or deleted advisors are
/// filtered out before scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorCandidate {
    pub advisor_id: String,
    pub features: AdvisorFeatures,
    pub active: bool,
    pub deleted: bool,
}

// ============================================================================
// Scores
// ============================================================================

/// Compatibility score between one founder and one advisor.
///
/// Pure value with no identity. `overall` is the clamped sum of the
/// component sub-scores and always lands in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchScore {
    pub overall: u8,
    pub sector_score: u8,
    pub stage_score: u8,
    pub expertise_score: u8,
    pub timezone_score: u8,
}

// ============================================================================
// Assignments
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Pending,
    Active,
    Completed,
    Terminated,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Active => "active",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Terminated => "terminated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AssignmentStatus::Pending),
            "active" => Some(AssignmentStatus::Active),
            "completed" => Some(AssignmentStatus::Completed),
            "terminated" => Some(AssignmentStatus::Terminated),
            _ => None,
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AssignmentStatus::Completed | AssignmentStatus::Terminated
        )
    }

    /// States that count against the one-open-assignment-per-founder
    /// invariant.
    pub fn is_open(&self) -> bool {
        matches!(self, AssignmentStatus::Pending | AssignmentStatus::Active)
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A founder/advisor pairing with lifecycle status and derived rollups.
///
/// Owned exclusively by the lifecycle manager and mutated only through its
/// transition operations. Rows are never physically deleted; terminal
/// statuses preserve the audit trail. Timestamps are RFC 3339 strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub founder_id: String,
    pub advisor_id: String,
    pub status: AssignmentStatus,
    pub match_score: u8,
    pub assigned_by: String,
    pub assigned_at: String,
    /// When the assignment left service: completion time, or the effective
    /// date of a termination.
    pub completed_at: Option<String>,
    pub terminated_reason: Option<String>,
    pub notes: Option<String>,
    pub total_sessions: u32,
    pub completed_sessions: u32,
    pub avg_rating: Option<f64>,
    pub updated_at: String,
}

// ============================================================================
// Sessions (read-only ground truth, except for termination cascade)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(SessionStatus::Scheduled),
            "completed" => Some(SessionStatus::Completed),
            "cancelled" => Some(SessionStatus::Cancelled),
            _ => None,
        }
    }
}

/// A mentorship session belonging to one assignment. Ratings are 1-5 and
/// optional on both sides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub assignment_id: String,
    pub status: SessionStatus,
    pub scheduled_at: Option<String>,
    pub founder_rating: Option<u8>,
    pub advisor_rating: Option<u8>,
}

// ============================================================================
// Planning and bulk creation
// ============================================================================

/// One proposal emitted by the bulk assignment planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedAssignment {
    pub founder_id: String,
    pub advisor_id: String,
    pub score: MatchScore,
}

/// Per-proposal result of a bulk create. One rejected proposal never
/// aborts the batch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum BulkCreateOutcome {
    Created {
        founder_id: String,
        assignment_id: String,
    },
    SkippedDuplicate {
        founder_id: String,
    },
    Failed {
        founder_id: String,
        message: String,
    },
}

// ============================================================================
// Reconciliation
// ============================================================================

/// Stored vs recomputed rollups for one assignment. Drift is a report,
/// not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub assignment_id: String,
    pub stored_total_sessions: u32,
    pub computed_total_sessions: u32,
    pub stored_completed_sessions: u32,
    pub computed_completed_sessions: u32,
    pub stored_avg_rating: Option<f64>,
    pub computed_avg_rating: Option<f64>,
    pub total_sessions_drift: bool,
    pub completed_sessions_drift: bool,
    pub avg_rating_drift: bool,
}

impl ReconciliationReport {
    pub fn has_drift(&self) -> bool {
        self.total_sessions_drift || self.completed_sessions_drift || self.avg_rating_drift
    }
}

// ============================================================================
// Profile change feed
// ============================================================================

/// Change notification from the external profile store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChangeEvent {
    pub user_id: String,
    pub profile_type: ProfileType,
    pub changed_at: String,
}
