use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// One answer choice on a career-interest question.
///
/// The question bank was seeded from the portal's original dataset, which
/// stored the role label under `roleMapping`; both spellings are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CareerOption {
    pub id: String,
    pub text: String,
    #[serde(alias = "roleMapping", default, skip_serializing_if = "Option::is_none")]
    pub role_mapping: Option<String>,
}

/// A career-interest question served during the first phase of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CareerQuestion {
    pub id: Uuid,
    pub prompt: String,
    pub options: Vec<CareerOption>,
}

/// Raw `career_questions` row; `options` stays jsonb until parsed.
#[derive(Debug, Clone, FromRow)]
pub struct CareerQuestionRow {
    pub id: Uuid,
    pub prompt: String,
    pub options: Value,
}

/// A question served by the remote skill-testing API.
///
/// The upstream emits several shapes (options as an array, or as up to four
/// labeled fields); `skill_client::decode` normalizes them into this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillQuestion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    pub options: Vec<String>,
}
