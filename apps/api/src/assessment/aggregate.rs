//! Combines the two skill-session reports and the career answers into one
//! final result.
//!
//! Pure arithmetic over already-fetched data. The upstream grader is
//! inconsistent about totals, so each side recovers a score from its
//! per-skill percentages when the explicit number is missing, and the grand
//! question count falls back to twice the requested session size when both
//! sides report zero.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::models::report::{AssessmentResult, CareerAnswer, SkillBreakdown, SkillReport};
use crate::skill_client::decode;

/// Role recorded when neither report ventured a guess.
pub const FALLBACK_ROLE: &str = "N/A";

/// Builds the final result from whatever reports survived the run. A missing
/// report contributes zero to both totals.
pub fn combine(
    career_answers: &[CareerAnswer],
    technical: Option<&SkillReport>,
    soft: Option<&SkillReport>,
    questions_per_session: u32,
) -> AssessmentResult {
    let tech_side = side_totals(technical, questions_per_session);
    let soft_side = side_totals(soft, questions_per_session);

    // Totals come straight off the wire; saturate rather than trust them to
    // stay in range.
    let total_score = tech_side.score.saturating_add(soft_side.score);
    let mut total_questions = tech_side.questions.saturating_add(soft_side.questions);
    if total_questions == 0 {
        total_questions = questions_per_session.saturating_mul(2);
    }

    // Soft-skill report wins the role call; the technical one is the backup.
    let final_role = soft
        .and_then(|r| r.final_role_guess.clone())
        .or_else(|| technical.and_then(|r| r.final_role_guess.clone()))
        .unwrap_or_else(|| FALLBACK_ROLE.to_string());

    AssessmentResult {
        total_score,
        total_questions,
        final_role,
        skills: SkillBreakdown {
            technical: percentages(technical),
            soft: percentages(soft),
        },
        career_answers: career_answers.to_vec(),
    }
}

struct SideTotals {
    score: u32,
    questions: u32,
}

fn side_totals(report: Option<&SkillReport>, requested: u32) -> SideTotals {
    let Some(report) = report else {
        return SideTotals {
            score: 0,
            questions: 0,
        };
    };
    match report.total_score {
        // An explicit score is authoritative, even when it is zero.
        Some(score) => SideTotals {
            score,
            questions: report.total_questions.unwrap_or(0),
        },
        None => match derived_score(&report.per_skill_percentage, requested) {
            Some(score) => SideTotals {
                score,
                questions: report.total_questions.unwrap_or(requested),
            },
            None => SideTotals {
                score: 0,
                questions: report.total_questions.unwrap_or(0),
            },
        },
    }
}

/// Recovers a score from the per-skill percentages: the mean percentage
/// applied to the requested question count, rounded to the nearest whole
/// question. Unparseable entries are ignored; if none parse there is nothing
/// to derive from.
fn derived_score(per_skill: &BTreeMap<String, Value>, requested: u32) -> Option<u32> {
    let parsed: Vec<f64> = per_skill.values().filter_map(decode::percent_value).collect();
    if parsed.is_empty() {
        return None;
    }
    let mean = parsed.iter().sum::<f64>() / parsed.len() as f64;
    Some(((mean / 100.0) * f64::from(requested)).round() as u32)
}

fn percentages(report: Option<&SkillReport>) -> BTreeMap<String, Value> {
    report
        .map(|r| r.per_skill_percentage.clone())
        .unwrap_or_default()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn report(
        score: Option<u32>,
        questions: Option<u32>,
        role: Option<&str>,
        per_skill: &[(&str, Value)],
    ) -> SkillReport {
        SkillReport {
            total_score: score,
            total_questions: questions,
            final_role_guess: role.map(str::to_string),
            per_skill_percentage: per_skill
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    fn answers(n: usize) -> Vec<CareerAnswer> {
        (0..n)
            .map(|i| CareerAnswer {
                question_id: Uuid::new_v4(),
                chosen_text: format!("choice {i}"),
            })
            .collect()
    }

    #[test]
    fn sums_scores_and_question_counts_across_tracks() {
        let tech = report(Some(4), Some(5), None, &[]);
        let soft = report(Some(2), Some(5), Some("Team Lead"), &[]);
        let result = combine(&answers(3), Some(&tech), Some(&soft), 5);
        assert_eq!(result.total_score, 6);
        assert_eq!(result.total_questions, 10);
        assert_eq!(result.final_role, "Team Lead");
        assert_eq!(result.career_answers.len(), 3);
    }

    #[test]
    fn extreme_reported_totals_saturate_instead_of_wrapping() {
        // The grader's totals are not validated upstream; a run must still
        // produce a result when they sit at the type's ceiling.
        let tech = report(Some(u32::MAX), Some(u32::MAX), None, &[]);
        let soft = report(Some(3), Some(3), Some("Team Lead"), &[]);
        let result = combine(&answers(1), Some(&tech), Some(&soft), 5);
        assert_eq!(result.total_score, u32::MAX);
        assert_eq!(result.total_questions, u32::MAX);
        assert_eq!(result.final_role, "Team Lead");
    }

    #[test]
    fn zero_question_runs_fall_back_to_twice_the_requested_count() {
        // Grader reported an empty set on one side; the other never produced
        // a report at all.
        let tech = report(Some(0), Some(0), None, &[]);
        let result = combine(&[], Some(&tech), None, 5);
        assert_eq!(result.total_score, 0);
        assert_eq!(result.total_questions, 10);
        assert_eq!(result.final_role, FALLBACK_ROLE);
    }

    #[test]
    fn missing_score_is_derived_from_mean_percentage() {
        // (80 + 40) / 2 = 60% of 5 questions, rounded: 3.
        let tech = report(
            None,
            None,
            None,
            &[("JavaScript", json!("80%")), ("SQL", json!("40%"))],
        );
        let result = combine(&[], Some(&tech), None, 5);
        assert_eq!(result.total_score, 3);
        assert_eq!(result.total_questions, 5);
    }

    #[test]
    fn derived_side_keeps_an_explicit_question_count() {
        let tech = report(None, Some(7), None, &[("Go", json!(100))]);
        let result = combine(&[], Some(&tech), None, 5);
        assert_eq!(result.total_score, 5);
        assert_eq!(result.total_questions, 7);
    }

    #[test]
    fn explicit_zero_score_is_not_overridden_by_percentages() {
        let tech = report(Some(0), Some(5), None, &[("Rust", json!("100%"))]);
        let result = combine(&[], Some(&tech), None, 5);
        assert_eq!(result.total_score, 0);
        assert_eq!(result.total_questions, 5);
    }

    #[test]
    fn mixed_numeric_and_string_percentages_average_together() {
        // (50 + 100) / 2 = 75% of 4 questions, rounded: 3.
        let soft = report(
            None,
            None,
            None,
            &[("Communication", json!(50)), ("Empathy", json!("100%"))],
        );
        let result = combine(&[], None, Some(&soft), 4);
        assert_eq!(result.total_score, 3);
        assert_eq!(result.total_questions, 4);
    }

    #[test]
    fn unparseable_percentages_are_skipped_in_the_mean() {
        let soft = report(
            None,
            None,
            None,
            &[("Empathy", json!("n/a")), ("Clarity", json!("50%"))],
        );
        let result = combine(&[], None, Some(&soft), 4);
        assert_eq!(result.total_score, 2);
    }

    #[test]
    fn nothing_derivable_scores_zero_without_inventing_questions() {
        let soft = report(None, None, None, &[("Empathy", json!("unknown"))]);
        let result = combine(&[], None, Some(&soft), 5);
        assert_eq!(result.total_score, 0);
        // The side contributed no questions, so the grand fallback applies.
        assert_eq!(result.total_questions, 10);
    }

    #[test]
    fn soft_role_guess_outranks_technical() {
        let tech = report(Some(1), Some(5), Some("Backend Engineer"), &[]);
        let soft = report(Some(1), Some(5), Some("Product Manager"), &[]);
        let result = combine(&[], Some(&tech), Some(&soft), 5);
        assert_eq!(result.final_role, "Product Manager");

        let quiet_soft = report(Some(1), Some(5), None, &[]);
        let result = combine(&[], Some(&tech), Some(&quiet_soft), 5);
        assert_eq!(result.final_role, "Backend Engineer");
    }

    #[test]
    fn breakdown_keeps_tracks_separate() {
        let tech = report(Some(3), Some(5), None, &[("Rust", json!("60%"))]);
        let soft = report(Some(4), Some(5), None, &[("Clarity", json!("80%"))]);
        let result = combine(&[], Some(&tech), Some(&soft), 5);
        assert_eq!(result.skills.technical.get("Rust"), Some(&json!("60%")));
        assert_eq!(result.skills.soft.get("Clarity"), Some(&json!("80%")));
        assert!(result.skills.technical.get("Clarity").is_none());
    }

    #[test]
    fn career_answers_are_carried_through_in_order() {
        let recorded = answers(2);
        let result = combine(&recorded, None, None, 5);
        assert_eq!(result.career_answers[0].chosen_text, "choice 0");
        assert_eq!(result.career_answers[1].chosen_text, "choice 1");
    }
}
