//! Profile normalizer: loosely-typed profile payloads in, comparable
//! feature sets out.
//!
//! The profile store hands us JSON maps with inconsistent field names
//! across intake cohorts, so each field is probed through a list of
//! accepted aliases. Missing optional fields fall back to neutral values
//! (empty string, empty set) rather than failing; only a payload with no
//! identifiable role-specific fields at all is rejected.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::MatchError;
use crate::types::{AdvisorFeatures, FounderFeatures};

const SECTOR_ALIASES: &[&str] = &["sector", "industry"];
const STAGE_ALIASES: &[&str] = &["stage", "company_stage"];
const CHALLENGE_ALIASES: &[&str] = &["challenges", "challenge_tags", "needs"];
const EXPERTISE_ALIASES: &[&str] = &["expertise", "expertise_tags", "skills"];
const STAGE_FOCUS_ALIASES: &[&str] = &["stage_focus", "stages"];
const TIMEZONE_ALIASES: &[&str] = &["timezone", "time_zone", "tz"];
const NAME_ALIASES: &[&str] = &["display_name", "name", "full_name"];

/// Extract founder features from a raw profile payload.
///
/// Fails with `IncompleteProfile` when the payload is not a JSON object or
/// carries none of the founder-specific fields (sector, stage, challenges).
pub fn normalize_founder(payload: &Value) -> Result<FounderFeatures, MatchError> {
    let obj = as_object(payload)?;

    let sector = string_field(obj, SECTOR_ALIASES);
    let stage = string_field(obj, STAGE_ALIASES).map(|s| s.to_lowercase());
    let challenges = tag_field(obj, CHALLENGE_ALIASES);

    if sector.is_none() && stage.is_none() && challenges.is_none() {
        return Err(MatchError::IncompleteProfile {
            reason: "no founder fields present (sector, stage, challenges)".to_string(),
        });
    }

    Ok(FounderFeatures {
        sector: sector.unwrap_or_default(),
        stage: stage.unwrap_or_default(),
        challenges: challenges.unwrap_or_default(),
        timezone: string_field(obj, TIMEZONE_ALIASES).unwrap_or_default(),
        display_name: string_field(obj, NAME_ALIASES),
    })
}

/// Extract advisor features from a raw profile payload.
///
/// Fails with `IncompleteProfile` when the payload is not a JSON object or
/// carries none of the advisor-specific fields (sector, expertise,
/// stage focus).
pub fn normalize_advisor(payload: &Value) -> Result<AdvisorFeatures, MatchError> {
    let obj = as_object(payload)?;

    let sector = string_field(obj, SECTOR_ALIASES);
    let expertise = tag_field(obj, EXPERTISE_ALIASES);
    let stage_focus = tag_field(obj, STAGE_FOCUS_ALIASES);

    if sector.is_none() && expertise.is_none() && stage_focus.is_none() {
        return Err(MatchError::IncompleteProfile {
            reason: "no advisor fields present (sector, expertise, stage focus)".to_string(),
        });
    }

    Ok(AdvisorFeatures {
        sector: sector.unwrap_or_default(),
        stage_focus: stage_focus.unwrap_or_default(),
        expertise: expertise.unwrap_or_default(),
        timezone: string_field(obj, TIMEZONE_ALIASES).unwrap_or_default(),
        display_name: string_field(obj, NAME_ALIASES),
    })
}

fn as_object(payload: &Value) -> Result<&Map<String, Value>, MatchError> {
    payload.as_object().ok_or_else(|| MatchError::IncompleteProfile {
        reason: "profile payload is not a JSON object".to_string(),
    })
}

/// First non-empty string under any of the aliases.
fn string_field(obj: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    for key in aliases {
        if let Some(raw) = obj.get(*key).and_then(|v| v.as_str()) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// First array under any of the aliases, canonicalized to a lowercase tag
/// set. A present-but-empty array still counts as "field present".
fn tag_field(obj: &Map<String, Value>, aliases: &[&str]) -> Option<BTreeSet<String>> {
    for key in aliases {
        if let Some(arr) = obj.get(*key).and_then(|v| v.as_array()) {
            let tags = arr
                .iter()
                .filter_map(|v| v.as_str())
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
            return Some(tags);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn founder_with_aliased_fields() {
        let payload = json!({
            "industry": "FinTech",
            "company_stage": "Seed",
            "challenge_tags": ["Compliance", " growth "],
            "time_zone": "GMT+1",
            "name": "Ada"
        });

        let features = normalize_founder(&payload).unwrap();
        assert_eq!(features.sector, "FinTech");
        assert_eq!(features.stage, "seed");
        assert!(features.challenges.contains("compliance"));
        assert!(features.challenges.contains("growth"));
        assert_eq!(features.timezone, "GMT+1");
        assert_eq!(features.display_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn missing_optionals_default_to_neutral() {
        let payload = json!({ "sector": "AgriTech" });
        let features = normalize_founder(&payload).unwrap();
        assert_eq!(features.stage, "");
        assert!(features.challenges.is_empty());
        assert_eq!(features.timezone, "");
        assert!(features.display_name.is_none());
    }

    #[test]
    fn founder_without_role_fields_is_incomplete() {
        let payload = json!({ "name": "Nobody", "timezone": "GMT" });
        let err = normalize_founder(&payload).unwrap_err();
        assert!(matches!(err, MatchError::IncompleteProfile { .. }));
    }

    #[test]
    fn non_object_payload_is_incomplete() {
        let err = normalize_advisor(&json!("just a string")).unwrap_err();
        assert!(matches!(err, MatchError::IncompleteProfile { .. }));
    }

    #[test]
    fn advisor_tags_are_canonicalized() {
        let payload = json!({
            "expertise": ["  Compliance", "GROWTH", ""],
            "stages": ["Seed", "Series-A"]
        });

        let features = normalize_advisor(&payload).unwrap();
        assert_eq!(features.expertise.len(), 2);
        assert!(features.expertise.contains("compliance"));
        assert!(features.expertise.contains("growth"));
        assert!(features.stage_focus.contains("series-a"));
    }

    #[test]
    fn empty_tag_array_counts_as_present() {
        // An advisor who explicitly declared zero expertise tags is sparse,
        // not incomplete.
        let payload = json!({ "expertise": [] });
        let features = normalize_advisor(&payload).unwrap();
        assert!(features.expertise.is_empty());
    }
}
