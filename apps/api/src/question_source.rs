//! Career-question supply for the first phase of a run.
//!
//! Questions live in the `career_questions` table with their options as
//! jsonb, seeded from the portal's original dataset. Each run draws a fresh
//! randomized batch.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;

use crate::models::question::{CareerOption, CareerQuestion, CareerQuestionRow};

/// Seam for the career-question supply.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Fetches up to `limit` questions in random order. A short batch is
    /// acceptable; an empty one is not an error here and is handled by the
    /// caller.
    async fn career_batch(&self, limit: u32) -> Result<Vec<CareerQuestion>>;
}

pub struct PgQuestionSource {
    pool: PgPool,
}

impl PgQuestionSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionSource for PgQuestionSource {
    async fn career_batch(&self, limit: u32) -> Result<Vec<CareerQuestion>> {
        let rows: Vec<CareerQuestionRow> = sqlx::query_as(
            r#"
            SELECT id, prompt, options
            FROM career_questions
            ORDER BY RANDOM()
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch career questions")?;

        Ok(rows
            .into_iter()
            .map(|row| CareerQuestion {
                id: row.id,
                prompt: row.prompt,
                options: options_from_json(row.id, &row.options),
            })
            .collect())
    }
}

/// Parses a question's `options` jsonb column. Entries that do not match the
/// expected shape are skipped with a warning so one bad seed row cannot take
/// the whole batch down.
fn options_from_json(question_id: uuid::Uuid, raw: &serde_json::Value) -> Vec<CareerOption> {
    let Some(items) = raw.as_array() else {
        warn!(%question_id, "career question options are not an array");
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            match serde_json::from_value::<CareerOption>(item.clone()) {
                Ok(option) => Some(option),
                Err(err) => {
                    warn!(%question_id, %err, "skipping malformed career option");
                    None
                }
            }
        })
        .collect()
}
