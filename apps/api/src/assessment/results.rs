//! Persistence of finished assessment results.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::report::AssessmentResult;

/// Seam for result persistence. The flow only needs to write; reporting
/// surfaces read the table directly.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn save(&self, user_id: Uuid, result: &AssessmentResult) -> Result<()>;
}

pub struct PgResultStore {
    pool: PgPool,
}

impl PgResultStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultStore for PgResultStore {
    /// Upserts the user's result. A retaken assessment overwrites the
    /// previous outcome rather than accumulating rows.
    async fn save(&self, user_id: Uuid, result: &AssessmentResult) -> Result<()> {
        let skills =
            serde_json::to_value(&result.skills).context("failed to encode skill breakdown")?;
        let career_answers = serde_json::to_value(&result.career_answers)
            .context("failed to encode career answers")?;

        sqlx::query(
            r#"
            INSERT INTO assessment_results
                (user_id, total_score, total_questions, final_role, skills, career_answers, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, now())
            ON CONFLICT (user_id) DO UPDATE SET
                total_score = EXCLUDED.total_score,
                total_questions = EXCLUDED.total_questions,
                final_role = EXCLUDED.final_role,
                skills = EXCLUDED.skills,
                career_answers = EXCLUDED.career_answers,
                completed_at = EXCLUDED.completed_at
            "#,
        )
        .bind(user_id)
        .bind(i64::from(result.total_score))
        .bind(i64::from(result.total_questions))
        .bind(&result.final_role)
        .bind(skills)
        .bind(career_answers)
        .execute(&self.pool)
        .await
        .context("failed to save assessment result")?;

        info!(%user_id, total_score = result.total_score, "assessment result saved");
        Ok(())
    }
}
