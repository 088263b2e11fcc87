//! Client for the external skill-testing API.
//!
//! One session per track: `start` returns a session id plus the first
//! question, `submit` returns the next question until the set is exhausted,
//! and `finish` returns the grading report. All response bodies go through
//! [`decode`] because the upstream's shapes vary between deployments.

pub mod decode;

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::models::question::SkillQuestion;
use crate::models::report::{SkillReport, SkillTrack};

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum SkillApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("skill API returned status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("failed to parse skill API response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unexpected skill API response shape: {0}")]
    Shape(String),
}

/// A freshly started skill session.
#[derive(Debug, Clone)]
pub struct StartedSession {
    pub session_id: String,
    pub first_question: SkillQuestion,
}

/// Seam for the skill-testing API so the assessment flow can be driven by a
/// scripted double in tests.
#[async_trait]
pub trait SkillApi: Send + Sync {
    /// Starts a session on `track` with `question_count` questions. The
    /// technical track is themed by `role_hint` when one was latched.
    async fn start_session(
        &self,
        track: SkillTrack,
        question_count: u32,
        role_hint: Option<&str>,
    ) -> Result<StartedSession, SkillApiError>;

    /// Submits an answer; returns the next question, or `None` when the
    /// session has no questions left.
    async fn submit_answer(
        &self,
        track: SkillTrack,
        session_id: &str,
        question_text: &str,
        answer: &str,
    ) -> Result<Option<SkillQuestion>, SkillApiError>;

    /// Closes the session and retrieves its grading report.
    async fn finish_session(
        &self,
        track: SkillTrack,
        session_id: &str,
    ) -> Result<SkillReport, SkillApiError>;
}

pub struct SkillClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl SkillClient {
    pub fn new(base_url: &str, token: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build skill API HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn endpoint(&self, track: SkillTrack, leaf: &str) -> String {
        format!("{}/assessments/{}/{}", self.base_url, track, leaf)
    }

    async fn post(&self, url: &str, payload: &Value) -> Result<Value, SkillApiError> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SkillApiError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl SkillApi for SkillClient {
    async fn start_session(
        &self,
        track: SkillTrack,
        question_count: u32,
        role_hint: Option<&str>,
    ) -> Result<StartedSession, SkillApiError> {
        let mut payload = Map::new();
        payload.insert("numQuestions".into(), json!(question_count));
        if let Some(role) = role_hint {
            payload.insert("roleMapping".into(), json!(role));
        }
        debug!(%track, question_count, "starting skill session");

        let body = self
            .post(&self.endpoint(track, "start"), &Value::Object(payload))
            .await?;
        let session_id = decode::session_id(&body).ok_or_else(|| {
            SkillApiError::Shape(format!("no session id in {track} start response"))
        })?;
        let first_question = decode::first_question(&body).ok_or_else(|| {
            SkillApiError::Shape(format!("no first question in {track} start response"))
        })?;
        Ok(StartedSession {
            session_id,
            first_question,
        })
    }

    async fn submit_answer(
        &self,
        track: SkillTrack,
        session_id: &str,
        question_text: &str,
        answer: &str,
    ) -> Result<Option<SkillQuestion>, SkillApiError> {
        let payload = json!({
            "sessionId": session_id,
            "questionText": question_text,
            "answer": answer,
        });
        let body = self.post(&self.endpoint(track, "submit"), &payload).await?;
        match decode::next_step(&body) {
            decode::NextStep::Question(question) => Ok(Some(question)),
            decode::NextStep::Done => Ok(None),
            decode::NextStep::Malformed { key } => Err(SkillApiError::Shape(format!(
                "unreadable next question under '{key}' in {track} submit response"
            ))),
        }
    }

    async fn finish_session(
        &self,
        track: SkillTrack,
        session_id: &str,
    ) -> Result<SkillReport, SkillApiError> {
        let payload = json!({ "sessionId": session_id });
        let body = self.post(&self.endpoint(track, "finish"), &payload).await?;
        debug!(%track, session_id, "skill session finished");
        Ok(serde_json::from_value(body)?)
    }
}
