use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::question::SkillQuestion;

/// The two skill tracks every run is assessed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillTrack {
    Technical,
    Soft,
}

impl SkillTrack {
    pub const ALL: [SkillTrack; 2] = [SkillTrack::Technical, SkillTrack::Soft];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillTrack::Technical => "technical",
            SkillTrack::Soft => "soft",
        }
    }
}

impl fmt::Display for SkillTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillTrack {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "technical" => Ok(SkillTrack::Technical),
            "soft" => Ok(SkillTrack::Soft),
            other => Err(format!(
                "unknown skill track '{other}' (expected 'technical' or 'soft')"
            )),
        }
    }
}

/// Grading report returned when a skill session is finished.
///
/// Every field is optional: the upstream omits totals for some question sets
/// and older deployments camelCase the keys. Missing numbers are recovered
/// from `per_skill_percentage` during aggregation when possible.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillReport {
    #[serde(alias = "totalScore")]
    pub total_score: Option<u32>,
    #[serde(alias = "totalQuestions")]
    pub total_questions: Option<u32>,
    #[serde(alias = "finalRoleGuess", alias = "finalRole")]
    pub final_role_guess: Option<String>,
    #[serde(alias = "perSkillPercentage", alias = "skillPercentages")]
    pub per_skill_percentage: BTreeMap<String, Value>,
}

/// Local view of one remote skill session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    /// Question awaiting an answer; `None` once the session is done.
    pub current: Option<SkillQuestion>,
    pub done: bool,
    /// Grading report, if the finish call succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<SkillReport>,
    pub answered: u32,
}

/// A recorded career-phase answer (kept in presentation order).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CareerAnswer {
    pub question_id: Uuid,
    pub chosen_text: String,
}

/// Per-track skill percentages carried into the final result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillBreakdown {
    pub technical: BTreeMap<String, Value>,
    pub soft: BTreeMap<String, Value>,
}

/// The combined outcome of a finished run, as persisted and served.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub total_score: u32,
    pub total_questions: u32,
    pub final_role: String,
    pub skills: SkillBreakdown,
    pub career_answers: Vec<CareerAnswer>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn skill_report_accepts_camel_case_and_sparse_bodies() {
        let full: SkillReport = serde_json::from_value(json!({
            "totalScore": 4,
            "totalQuestions": 5,
            "finalRoleGuess": "Backend Developer",
            "perSkillPercentage": {"SQL": "80%"}
        }))
        .unwrap();
        assert_eq!(full.total_score, Some(4));
        assert_eq!(full.final_role_guess.as_deref(), Some("Backend Developer"));
        assert_eq!(full.per_skill_percentage.get("SQL"), Some(&json!("80%")));

        let sparse: SkillReport = serde_json::from_value(json!({"finalRole": "QA"})).unwrap();
        assert_eq!(sparse.total_score, None);
        assert_eq!(sparse.final_role_guess.as_deref(), Some("QA"));
        assert!(sparse.per_skill_percentage.is_empty());
    }

    #[test]
    fn track_names_round_trip_through_strings() {
        assert_eq!("technical".parse::<SkillTrack>(), Ok(SkillTrack::Technical));
        assert_eq!("soft".parse::<SkillTrack>(), Ok(SkillTrack::Soft));
        assert!("hard".parse::<SkillTrack>().is_err());
        assert_eq!(SkillTrack::Soft.to_string(), "soft");
    }
}
