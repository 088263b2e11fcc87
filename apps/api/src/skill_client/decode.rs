//! Shape-tolerant decoding of skill-API response bodies.
//!
//! The upstream service has drifted across deployments: questions arrive
//! under different keys, options come as arrays or labeled fields, and
//! percentages may be numbers or strings like "80%". Everything here is a
//! pure function over `serde_json::Value` so the tolerance rules stay
//! testable without a network.

use serde_json::{Map, Value};

use crate::models::question::SkillQuestion;

/// Outcome of decoding a submit response.
#[derive(Debug, Clone, PartialEq)]
pub enum NextStep {
    /// The session continues with this question.
    Question(SkillQuestion),
    /// No continuation key was present (or it was null): the session is over.
    Done,
    /// A continuation key was present but its payload was unreadable.
    Malformed { key: &'static str },
}

const NEXT_KEYS: [&str; 4] = ["nextQuestion", "next_question", "question", "questions"];
const FIRST_KEYS: [&str; 4] = ["questions", "firstQuestion", "first_question", "question"];
const TEXT_KEYS: [&str; 4] = ["text", "question", "questionText", "question_text"];
const SESSION_KEYS: [&str; 3] = ["sessionId", "session_id", "id"];
const OPTION_FIELDS: [[&str; 2]; 4] = [
    ["optionA", "option_a"],
    ["optionB", "option_b"],
    ["optionC", "option_c"],
    ["optionD", "option_d"],
];

/// Extracts the session identifier from a start response.
pub fn session_id(body: &Value) -> Option<String> {
    let obj = body.as_object()?;
    SESSION_KEYS.iter().find_map(|key| id_string(obj.get(*key)?))
}

/// Extracts the first question from a start response, trying the known
/// key variants in order.
pub fn first_question(body: &Value) -> Option<SkillQuestion> {
    let obj = body.as_object()?;
    FIRST_KEYS
        .iter()
        .filter_map(|key| obj.get(*key))
        .find_map(question_candidate)
}

/// Decodes a submit response into the session's next step.
///
/// An absent or null continuation key means the session is complete; a
/// present-but-unreadable one is reported as malformed rather than silently
/// ending the session.
pub fn next_step(body: &Value) -> NextStep {
    let Some(obj) = body.as_object() else {
        return NextStep::Malformed { key: "(body)" };
    };
    for key in NEXT_KEYS {
        match obj.get(key) {
            None | Some(Value::Null) => continue,
            Some(value) => {
                return match question_candidate(value) {
                    Some(question) => NextStep::Question(question),
                    None => NextStep::Malformed { key },
                };
            }
        }
    }
    NextStep::Done
}

/// Reads one question out of a candidate value, which may be the question
/// object itself or a non-empty array of them.
pub fn question_candidate(value: &Value) -> Option<SkillQuestion> {
    match value {
        Value::Array(items) => question_from_object(items.first()?.as_object()?),
        Value::Object(obj) => question_from_object(obj),
        _ => None,
    }
}

fn question_from_object(obj: &Map<String, Value>) -> Option<SkillQuestion> {
    let text = TEXT_KEYS
        .iter()
        .find_map(|key| obj.get(*key)?.as_str())?
        .to_string();
    let id = obj.get("id").and_then(id_string);
    Some(SkillQuestion {
        id,
        text,
        options: option_texts(obj),
    })
}

/// Collects answer options from either an `options` array (of strings or of
/// `{text}` objects) or the labeled `optionA`..`optionD` fields.
fn option_texts(obj: &Map<String, Value>) -> Vec<String> {
    if let Some(items) = obj.get("options").and_then(Value::as_array) {
        return items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(o) => Some(o.get("text")?.as_str()?.to_string()),
                _ => None,
            })
            .collect();
    }
    OPTION_FIELDS
        .iter()
        .filter_map(|variants| {
            variants
                .iter()
                .find_map(|key| obj.get(*key)?.as_str())
                .map(str::to_string)
        })
        .collect()
}

/// Parses a per-skill percentage, which may be a JSON number or a string
/// such as "80", "80%", or "80.5 %".
pub fn percent_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_id_accepts_string_and_number_variants() {
        assert_eq!(
            session_id(&json!({"sessionId": "abc-1"})).as_deref(),
            Some("abc-1")
        );
        assert_eq!(
            session_id(&json!({"session_id": "xyz"})).as_deref(),
            Some("xyz")
        );
        assert_eq!(session_id(&json!({"id": 42})).as_deref(), Some("42"));
        assert_eq!(session_id(&json!({"token": "nope"})), None);
    }

    #[test]
    fn first_question_prefers_questions_array() {
        let body = json!({
            "sessionId": "s1",
            "questions": [
                {"text": "What is a closure?", "options": ["A", "B"]},
                {"text": "second"}
            ]
        });
        let q = first_question(&body).unwrap();
        assert_eq!(q.text, "What is a closure?");
        assert_eq!(q.options, vec!["A", "B"]);
    }

    #[test]
    fn first_question_falls_back_through_key_variants() {
        let camel = json!({"firstQuestion": {"text": "Q1"}});
        assert_eq!(first_question(&camel).unwrap().text, "Q1");

        let snake = json!({"first_question": {"questionText": "Q2"}});
        assert_eq!(first_question(&snake).unwrap().text, "Q2");

        let bare = json!({"question": {"question": "Q3"}});
        assert_eq!(first_question(&bare).unwrap().text, "Q3");
    }

    #[test]
    fn labeled_option_fields_are_collected_in_order() {
        let body = json!({"question": {
            "text": "Pick one",
            "optionA": "first",
            "optionB": "second",
            "option_c": "third",
            "optionD": "fourth"
        }});
        let q = first_question(&body).unwrap();
        assert_eq!(q.options, vec!["first", "second", "third", "fourth"]);
    }

    #[test]
    fn object_options_use_their_text_field() {
        let body = json!({"question": {
            "text": "Pick",
            "options": [{"text": "yes"}, {"text": "no"}, 7]
        }});
        assert_eq!(first_question(&body).unwrap().options, vec!["yes", "no"]);
    }

    #[test]
    fn next_step_reads_next_question() {
        let step = next_step(&json!({"nextQuestion": {"text": "more"}}));
        match step {
            NextStep::Question(q) => assert_eq!(q.text, "more"),
            other => panic!("expected a question, got {other:?}"),
        }
    }

    #[test]
    fn absent_or_null_continuation_means_done() {
        assert_eq!(next_step(&json!({"status": "complete"})), NextStep::Done);
        assert_eq!(next_step(&json!({"nextQuestion": null})), NextStep::Done);
        assert_eq!(next_step(&json!({})), NextStep::Done);
    }

    #[test]
    fn unreadable_continuation_is_malformed_not_done() {
        let step = next_step(&json!({"nextQuestion": 42}));
        assert_eq!(
            step,
            NextStep::Malformed {
                key: "nextQuestion"
            }
        );
        // A question object with no recognizable text is also malformed.
        let step = next_step(&json!({"question": {"prompt": "wrong key"}}));
        assert_eq!(step, NextStep::Malformed { key: "question" });
    }

    #[test]
    fn question_id_tolerates_numbers() {
        let q = question_candidate(&json!({"id": 9, "text": "t"})).unwrap();
        assert_eq!(q.id.as_deref(), Some("9"));
    }

    #[test]
    fn percent_value_parses_numbers_and_suffixed_strings() {
        assert_eq!(percent_value(&json!(80)), Some(80.0));
        assert_eq!(percent_value(&json!(80.5)), Some(80.5));
        assert_eq!(percent_value(&json!("40%")), Some(40.0));
        assert_eq!(percent_value(&json!(" 80.5 % ")), Some(80.5));
        assert_eq!(percent_value(&json!("80")), Some(80.0));
        assert_eq!(percent_value(&json!("n/a")), None);
        assert_eq!(percent_value(&json!(["80"])), None);
    }
}
