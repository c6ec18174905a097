//! Match scorer: weighted founder/advisor compatibility.
//!
//! Pure, total, deterministic. Unscored dimensions contribute zero; the
//! function never fails. The weights below are the documented contract and
//! hold for the duration of any ranking pass:
//!
//! - sector alignment: exact match (case-insensitive) or nothing
//! - stage fit: advisor covers the founder's stage, or an adjacent stage
//!   on the ladder idea -> pre-seed -> seed -> series-a -> growth
//! - expertise: overlap ratio against the founder's declared challenges
//! - timezone: same offset, within a few hours, or distant

use std::collections::BTreeSet;

use crate::types::{AdvisorFeatures, FounderFeatures, MatchScore};

const SECTOR_MATCH_SCORE: u8 = 30;
const STAGE_EXACT_SCORE: u8 = 20;
const STAGE_ADJACENT_SCORE: u8 = 10;
const EXPERTISE_MAX_SCORE: u8 = 35;
const TIMEZONE_SAME_SCORE: u8 = 15;
const TIMEZONE_NEAR_SCORE: u8 = 8;
const TIMEZONE_NEAR_MINUTES: i32 = 3 * 60;

const STAGE_LADDER: &[&str] = &["idea", "pre-seed", "seed", "series-a", "growth"];

/// Score one founder against one advisor.
pub fn score(founder: &FounderFeatures, advisor: &AdvisorFeatures) -> MatchScore {
    let sector_score = sector_fit(&founder.sector, &advisor.sector);
    let stage_score = stage_fit(&founder.stage, &advisor.stage_focus);
    let expertise_score = expertise_overlap(&founder.challenges, &advisor.expertise);
    let timezone_score = timezone_fit(&founder.timezone, &advisor.timezone);

    let total = sector_score as u32 + stage_score as u32 + expertise_score as u32
        + timezone_score as u32;

    MatchScore {
        overall: total.min(100) as u8,
        sector_score,
        stage_score,
        expertise_score,
        timezone_score,
    }
}

fn sector_fit(founder_sector: &str, advisor_sector: &str) -> u8 {
    if !founder_sector.is_empty() && founder_sector.eq_ignore_ascii_case(advisor_sector) {
        SECTOR_MATCH_SCORE
    } else {
        0
    }
}

fn stage_fit(stage: &str, stage_focus: &BTreeSet<String>) -> u8 {
    if stage.is_empty() || stage_focus.is_empty() {
        return 0;
    }
    if stage_focus.contains(stage) {
        return STAGE_EXACT_SCORE;
    }

    // Adjacent rung on the ladder still earns partial credit. Stages off
    // the ladder only score on an exact focus match.
    let Some(idx) = STAGE_LADDER.iter().position(|s| *s == stage) else {
        return 0;
    };
    let adjacent = idx
        .checked_sub(1)
        .map(|i| STAGE_LADDER[i])
        .into_iter()
        .chain(STAGE_LADDER.get(idx + 1).copied());

    for neighbor in adjacent {
        if stage_focus.contains(neighbor) {
            return STAGE_ADJACENT_SCORE;
        }
    }
    0
}

/// Intersection ratio against the founder's declared challenges, scaled to
/// `EXPERTISE_MAX_SCORE`. No declared challenges means nothing to overlap.
fn expertise_overlap(challenges: &BTreeSet<String>, expertise: &BTreeSet<String>) -> u8 {
    if challenges.is_empty() {
        return 0;
    }
    let overlap = challenges.intersection(expertise).count();
    let ratio = overlap as f64 / challenges.len() as f64;
    (EXPERTISE_MAX_SCORE as f64 * ratio).round() as u8
}

fn timezone_fit(founder_tz: &str, advisor_tz: &str) -> u8 {
    let (Some(a), Some(b)) = (parse_offset_minutes(founder_tz), parse_offset_minutes(advisor_tz))
    else {
        return 0;
    };

    let distance = (a - b).abs();
    if distance == 0 {
        TIMEZONE_SAME_SCORE
    } else if distance <= TIMEZONE_NEAR_MINUTES {
        TIMEZONE_NEAR_SCORE
    } else {
        0
    }
}

/// Parse a coarse GMT/UTC offset like "GMT+1", "UTC-8", or "UTC+05:30".
/// Bare "GMT"/"UTC" means zero. Anything else is unscoreable.
fn parse_offset_minutes(tz: &str) -> Option<i32> {
    let t = tz.trim().to_uppercase();
    if t.is_empty() {
        return None;
    }

    let rest = t
        .strip_prefix("GMT")
        .or_else(|| t.strip_prefix("UTC"))
        .unwrap_or(&t);
    if rest.is_empty() {
        return Some(0);
    }

    let (sign, digits) = match rest.strip_prefix('+') {
        Some(d) => (1, d),
        None => (-1, rest.strip_prefix('-')?),
    };

    let mut parts = digits.splitn(2, ':');
    let hours: i32 = parts.next()?.parse().ok()?;
    let minutes: i32 = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    if hours > 14 || minutes >= 60 {
        return None;
    }
    Some(sign * (hours * 60 + minutes))
}
