//! The assessment run state machine.
//!
//! A run moves through three phases in one direction only: career questions,
//! then two concurrent skill sessions, then finished once the combined
//! result is saved. Handlers hold the run's lock while calling in, so each
//! method can assume exclusive access; collaborators are passed per call and
//! never stored, which keeps the state serializable.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

use crate::assessment::aggregate;
use crate::assessment::results::ResultStore;
use crate::models::question::{CareerQuestion, SkillQuestion};
use crate::models::report::{AssessmentResult, CareerAnswer, SessionState, SkillTrack};
use crate::question_source::QuestionSource;
use crate::skill_client::SkillApi;

/// Theme sent to the technical track when no career answer carried a role.
const DEFAULT_ROLE_HINT: &str = "general";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Career,
    Assessment,
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Career => "career",
            Phase::Assessment => "assessment",
            Phase::Finished => "finished",
        })
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("career question fetch failed: {0}")]
    QuestionFetch(String),
    #[error("no skill session could be started (technical: {technical}; soft: {soft})")]
    SessionsUnavailable { technical: String, soft: String },
    #[error("skill sessions are already running")]
    SessionsAlreadyStarted,
    #[error("{track} answer submission failed: {message}")]
    Submission { track: SkillTrack, message: String },
    #[error("failed to save assessment result: {0}")]
    Persist(String),
    #[error("{operation} is not allowed in the {phase} phase")]
    WrongPhase {
        operation: &'static str,
        phase: Phase,
    },
    #[error("no active {track} session")]
    NoActiveSession { track: SkillTrack },
    #[error("the {track} session is already complete")]
    SessionComplete { track: SkillTrack },
    #[error("no career question is awaiting an answer")]
    NoPendingQuestion,
    #[error("question {submitted} is not the current career question")]
    StaleQuestion { submitted: Uuid },
    #[error("option '{option_id}' is not on the current question")]
    UnknownOption { option_id: String },
    #[error("no unsaved result to persist")]
    NothingToSave,
}

/// Tunables for a run, frozen at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    pub career_question_limit: u32,
    pub questions_per_session: u32,
    /// Pause between scoring and saving, so clients can show the completion
    /// screen before the run flips to finished. Off by default.
    pub finalize_delay_secs: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            career_question_limit: 5,
            questions_per_session: 5,
            finalize_delay_secs: 0,
        }
    }
}

/// A career answer as submitted by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct CareerPick {
    pub question_id: Uuid,
    pub option_id: String,
}

/// Progress after a career answer was accepted.
#[derive(Debug, Clone, Serialize)]
pub struct CareerAdvance {
    pub answered: usize,
    pub total: usize,
    pub next: Option<CareerQuestion>,
    pub phase: Phase,
}

/// Which tracks came up when skill sessions were requested.
#[derive(Debug, Clone, Serialize)]
pub struct SessionLaunch {
    pub started: Vec<SkillTrack>,
    pub failures: Vec<TrackFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackFailure {
    pub track: SkillTrack,
    pub error: String,
}

/// Progress after a skill answer was accepted.
#[derive(Debug, Clone, Serialize)]
pub struct SkillAdvance {
    pub track: SkillTrack,
    pub next: Option<SkillQuestion>,
    pub track_done: bool,
    pub phase: Phase,
    /// True when the run is fully scored but the save failed; the result is
    /// held in memory and can be flushed with a persist retry.
    pub persist_failed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CareerProgress {
    pub answered: usize,
    pub total: usize,
    pub current_question: Option<CareerQuestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub done: bool,
    pub answered: u32,
    pub scored: bool,
    pub current_question: Option<SkillQuestion>,
}

/// Read-only view of a run, as served to clients.
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub run_id: Uuid,
    pub user_id: Uuid,
    pub phase: Phase,
    pub career: CareerProgress,
    pub role_hint: Option<String>,
    pub technical: Option<SessionView>,
    pub soft: Option<SessionView>,
    pub result: Option<AssessmentResult>,
    pub persist_pending: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One user's assessment run. All mutation goes through the methods below;
/// the phase never moves backward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowState {
    run_id: Uuid,
    user_id: Uuid,
    phase: Phase,
    career_questions: Vec<CareerQuestion>,
    career_cursor: usize,
    career_answers: Vec<CareerAnswer>,
    /// First non-null role mapping seen among the chosen options.
    role_hint: Option<String>,
    sessions: BTreeMap<SkillTrack, SessionState>,
    result: Option<AssessmentResult>,
    persisted: bool,
    config: FlowConfig,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FlowState {
    pub fn new(user_id: Uuid, config: FlowConfig) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            user_id,
            phase: Phase::Career,
            career_questions: Vec::new(),
            career_cursor: 0,
            career_answers: Vec::new(),
            role_hint: None,
            sessions: BTreeMap::new(),
            result: None,
            persisted: false,
            config,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_career_question(&self) -> Option<&CareerQuestion> {
        self.career_questions.get(self.career_cursor)
    }

    pub fn session(&self, track: SkillTrack) -> Option<&SessionState> {
        self.sessions.get(&track)
    }

    pub fn result(&self) -> Option<&AssessmentResult> {
        self.result.as_ref()
    }

    /// True when the run is scored but the result has not reached storage.
    pub fn persist_pending(&self) -> bool {
        self.result.is_some() && !self.persisted
    }

    // ─────────────────────────────────────────────────────────────────────
    // Career phase
    // ─────────────────────────────────────────────────────────────────────

    /// Loads the career question batch. Calling again is a no-op once
    /// questions are present; after a failed or empty fetch the run stays in
    /// the career phase and the next call tries again.
    pub async fn start(
        &mut self,
        source: &dyn QuestionSource,
    ) -> Result<&[CareerQuestion], FlowError> {
        self.ensure_phase(Phase::Career, "starting")?;
        if self.career_questions.is_empty() {
            let requested = self.config.career_question_limit;
            let batch = source
                .career_batch(requested)
                .await
                .map_err(|err| FlowError::QuestionFetch(format!("{err:#}")))?;
            if (batch.len() as u32) < requested {
                warn!(
                    run_id = %self.run_id,
                    fetched = batch.len(),
                    requested,
                    "career question bank came up short"
                );
            }
            info!(run_id = %self.run_id, count = batch.len(), "career questions loaded");
            self.career_questions = batch;
            self.touch();
        }
        Ok(&self.career_questions)
    }

    /// Records an answer to the current career question and advances the
    /// cursor. The first chosen option that carries a role mapping fixes the
    /// run's role hint; later mappings are ignored. Answering the last
    /// question moves the run into the assessment phase.
    pub fn answer_career(&mut self, pick: CareerPick) -> Result<CareerAdvance, FlowError> {
        self.ensure_phase(Phase::Career, "a career answer")?;
        let Some(question) = self.career_questions.get(self.career_cursor) else {
            return Err(FlowError::NoPendingQuestion);
        };
        if pick.question_id != question.id {
            return Err(FlowError::StaleQuestion {
                submitted: pick.question_id,
            });
        }
        let Some(option) = question.options.iter().find(|o| o.id == pick.option_id) else {
            return Err(FlowError::UnknownOption {
                option_id: pick.option_id,
            });
        };

        self.career_answers.push(CareerAnswer {
            question_id: question.id,
            chosen_text: option.text.clone(),
        });
        if self.role_hint.is_none() {
            if let Some(role) = &option.role_mapping {
                info!(run_id = %self.run_id, %role, "role hint latched");
                self.role_hint = Some(role.clone());
            }
        }
        self.career_cursor += 1;
        if self.career_cursor >= self.career_questions.len() {
            self.phase = Phase::Assessment;
            info!(
                run_id = %self.run_id,
                answered = self.career_cursor,
                "career phase complete"
            );
        }
        self.touch();
        Ok(CareerAdvance {
            answered: self.career_cursor,
            total: self.career_questions.len(),
            next: self.career_questions.get(self.career_cursor).cloned(),
            phase: self.phase,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Assessment phase
    // ─────────────────────────────────────────────────────────────────────

    /// Starts whichever skill sessions are not running yet, both tracks in
    /// parallel on the first call. One track failing is not fatal as long as
    /// the other came up (or was already up); the failure is reported in the
    /// launch summary and a later call retries just the missing track. Only
    /// when no session exists at all does the run refuse to proceed.
    pub async fn begin_skill_sessions(
        &mut self,
        api: &dyn SkillApi,
    ) -> Result<SessionLaunch, FlowError> {
        self.ensure_phase(Phase::Assessment, "starting skill sessions")?;
        let need_technical = !self.sessions.contains_key(&SkillTrack::Technical);
        let need_soft = !self.sessions.contains_key(&SkillTrack::Soft);
        if !need_technical && !need_soft {
            return Err(FlowError::SessionsAlreadyStarted);
        }

        let count = self.config.questions_per_session;
        let role = self
            .role_hint
            .clone()
            .unwrap_or_else(|| DEFAULT_ROLE_HINT.to_string());
        info!(
            run_id = %self.run_id,
            %role,
            technical = need_technical,
            soft = need_soft,
            "starting skill sessions"
        );

        let (technical_outcome, soft_outcome) = match (need_technical, need_soft) {
            (true, true) => {
                let (technical, soft) = tokio::join!(
                    api.start_session(SkillTrack::Technical, count, Some(role.as_str())),
                    api.start_session(SkillTrack::Soft, count, None)
                );
                (Some(technical), Some(soft))
            }
            (true, false) => (
                Some(
                    api.start_session(SkillTrack::Technical, count, Some(role.as_str()))
                        .await,
                ),
                None,
            ),
            (false, true) => (
                None,
                Some(api.start_session(SkillTrack::Soft, count, None).await),
            ),
            (false, false) => (None, None),
        };

        let mut launch = SessionLaunch {
            started: Vec::new(),
            failures: Vec::new(),
        };
        for (track, outcome) in [
            (SkillTrack::Technical, technical_outcome),
            (SkillTrack::Soft, soft_outcome),
        ] {
            match outcome {
                None => {}
                Some(Ok(session)) => {
                    info!(
                        run_id = %self.run_id,
                        %track,
                        session_id = %session.session_id,
                        "skill session ready"
                    );
                    self.sessions.insert(
                        track,
                        SessionState {
                            session_id: session.session_id,
                            current: Some(session.first_question),
                            done: false,
                            report: None,
                            answered: 0,
                        },
                    );
                    launch.started.push(track);
                }
                Some(Err(err)) => {
                    warn!(run_id = %self.run_id, %track, "skill session start failed: {err}");
                    launch.failures.push(TrackFailure {
                        track,
                        error: err.to_string(),
                    });
                }
            }
        }

        if self.sessions.is_empty() {
            let message = |track: SkillTrack| {
                launch
                    .failures
                    .iter()
                    .find(|failure| failure.track == track)
                    .map(|failure| failure.error.clone())
                    .unwrap_or_else(|| "not attempted".to_string())
            };
            return Err(FlowError::SessionsUnavailable {
                technical: message(SkillTrack::Technical),
                soft: message(SkillTrack::Soft),
            });
        }
        self.touch();
        Ok(launch)
    }

    /// Submits an answer on one track. Nothing local changes unless the
    /// upstream accepted the submission, so a failed call can simply be
    /// retried with the same question on screen. When the last track
    /// finishes, the run is scored, saved, and moved to the finished phase
    /// in the same call.
    pub async fn answer_skill(
        &mut self,
        api: &dyn SkillApi,
        store: &dyn ResultStore,
        track: SkillTrack,
        answer: &str,
    ) -> Result<SkillAdvance, FlowError> {
        self.ensure_phase(Phase::Assessment, "a skill answer")?;
        let (session_id, question_text) = {
            let Some(session) = self.sessions.get(&track) else {
                return Err(FlowError::NoActiveSession { track });
            };
            if session.done {
                return Err(FlowError::SessionComplete { track });
            }
            let Some(current) = session.current.as_ref() else {
                return Err(FlowError::NoActiveSession { track });
            };
            (session.session_id.clone(), current.text.clone())
        };

        let outcome = api
            .submit_answer(track, &session_id, &question_text, answer)
            .await
            .map_err(|err| FlowError::Submission {
                track,
                message: err.to_string(),
            })?;

        let Some(session) = self.sessions.get_mut(&track) else {
            return Err(FlowError::NoActiveSession { track });
        };
        session.answered += 1;
        match outcome {
            Some(next) => {
                session.current = Some(next.clone());
                self.touch();
                Ok(SkillAdvance {
                    track,
                    next: Some(next),
                    track_done: false,
                    phase: self.phase,
                    persist_failed: false,
                })
            }
            None => {
                session.current = None;
                session.done = true;
                info!(
                    run_id = %self.run_id,
                    %track,
                    answered = session.answered,
                    "skill session complete"
                );
                match api.finish_session(track, &session_id).await {
                    Ok(report) => {
                        if let Some(session) = self.sessions.get_mut(&track) {
                            session.report = Some(report);
                        }
                    }
                    // The answers are in; scoring goes on without this
                    // report rather than stranding the run.
                    Err(err) => {
                        warn!(run_id = %self.run_id, %track, "finish call failed: {err}")
                    }
                }
                let persist_failed = self.finalize_if_complete(store).await;
                self.touch();
                Ok(SkillAdvance {
                    track,
                    next: None,
                    track_done: true,
                    phase: self.phase,
                    persist_failed,
                })
            }
        }
    }

    /// Retries the save of an already-computed result.
    pub async fn retry_persist(&mut self, store: &dyn ResultStore) -> Result<(), FlowError> {
        if !self.persist_pending() {
            return Err(FlowError::NothingToSave);
        }
        self.persist(store).await.map_err(FlowError::Persist)?;
        self.touch();
        Ok(())
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let view = |track: SkillTrack| {
            self.sessions.get(&track).map(|session| SessionView {
                done: session.done,
                answered: session.answered,
                scored: session.report.is_some(),
                current_question: session.current.clone(),
            })
        };
        RunSnapshot {
            run_id: self.run_id,
            user_id: self.user_id,
            phase: self.phase,
            career: CareerProgress {
                answered: self.career_cursor,
                total: self.career_questions.len(),
                current_question: self.current_career_question().cloned(),
            },
            role_hint: self.role_hint.clone(),
            technical: view(SkillTrack::Technical),
            soft: view(SkillTrack::Soft),
            result: self.result.clone(),
            persist_pending: self.persist_pending(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    /// Once both sessions are done, combines their reports exactly once and
    /// pushes the result to storage. Returns true when the save failed; the
    /// result stays in memory for a retry and the phase holds until a save
    /// succeeds.
    async fn finalize_if_complete(&mut self, store: &dyn ResultStore) -> bool {
        if self.result.is_some() {
            return false;
        }
        let all_done = SkillTrack::ALL
            .iter()
            .all(|track| self.sessions.get(track).map(|s| s.done).unwrap_or(false));
        if !all_done {
            return false;
        }

        for track in SkillTrack::ALL {
            if let Some(session) = self.sessions.get(&track) {
                if session.report.is_none() {
                    warn!(run_id = %self.run_id, %track, "no grading report; track counts as zero");
                }
            }
        }
        let technical = self
            .sessions
            .get(&SkillTrack::Technical)
            .and_then(|s| s.report.as_ref());
        let soft = self
            .sessions
            .get(&SkillTrack::Soft)
            .and_then(|s| s.report.as_ref());
        let result = aggregate::combine(
            &self.career_answers,
            technical,
            soft,
            self.config.questions_per_session,
        );
        info!(
            run_id = %self.run_id,
            total_score = result.total_score,
            total_questions = result.total_questions,
            final_role = %result.final_role,
            "assessment scored"
        );
        self.result = Some(result);

        if self.config.finalize_delay_secs > 0 {
            sleep(Duration::from_secs(self.config.finalize_delay_secs)).await;
        }
        self.persist(store).await.is_err()
    }

    async fn persist(&mut self, store: &dyn ResultStore) -> Result<(), String> {
        let Some(result) = self.result.clone() else {
            return Ok(());
        };
        match store.save(self.user_id, &result).await {
            Ok(()) => {
                self.persisted = true;
                self.phase = Phase::Finished;
                info!(run_id = %self.run_id, "assessment run finished");
                Ok(())
            }
            Err(err) => {
                warn!(run_id = %self.run_id, "result save failed, holding result in memory: {err:#}");
                Err(format!("{err:#}"))
            }
        }
    }

    fn ensure_phase(&self, expected: Phase, operation: &'static str) -> Result<(), FlowError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(FlowError::WrongPhase {
                operation,
                phase: self.phase,
            })
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
