//! HTTP handlers for assessment runs.
//!
//! Route shape: a run is created for a user, started to load its career
//! questions, answered question by question, and deleted if abandoned.
//! Handlers stay thin; all flow rules live in [`super::flow`].

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::assessment::flow::{
    CareerAdvance, CareerPick, FlowConfig, FlowState, Phase, RunSnapshot, SessionView,
    TrackFailure,
};
use crate::errors::AppError;
use crate::models::question::{CareerQuestion, SkillQuestion};
use crate::models::report::{AssessmentResult, SkillTrack};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateRunRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CreateRunResponse {
    pub run_id: Uuid,
    pub phase: Phase,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub run_id: Uuid,
    pub phase: Phase,
    pub questions: Vec<CareerQuestion>,
}

#[derive(Debug, Serialize)]
pub struct SessionLaunchResponse {
    pub phase: Phase,
    pub started: Vec<SkillTrack>,
    pub failures: Vec<TrackFailure>,
    pub technical: Option<SessionView>,
    pub soft: Option<SessionView>,
}

#[derive(Debug, Deserialize)]
pub struct SkillAnswerRequest {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct SkillAnswerResponse {
    pub track: SkillTrack,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<SkillQuestion>,
    pub track_done: bool,
    pub phase: Phase,
    pub persist_failed: bool,
    /// Present once the run is scored, even while the save is still pending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AssessmentResult>,
}

#[derive(Debug, Serialize)]
pub struct RetryPersistResponse {
    pub run_id: Uuid,
    pub phase: Phase,
}

pub async fn handle_create_run(
    State(state): State<AppState>,
    Json(req): Json<CreateRunRequest>,
) -> Result<(StatusCode, Json<CreateRunResponse>), AppError> {
    let config = FlowConfig {
        career_question_limit: state.config.career_question_limit,
        questions_per_session: state.config.session_question_count,
        finalize_delay_secs: state.config.finalize_delay_secs,
    };
    let flow = FlowState::new(req.user_id, config);
    let run_id = state.runs.insert(flow).await;
    info!(%run_id, user_id = %req.user_id, "assessment run created");
    Ok((
        StatusCode::CREATED,
        Json(CreateRunResponse {
            run_id,
            phase: Phase::Career,
        }),
    ))
}

pub async fn handle_start(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<StartResponse>, AppError> {
    let run = load_run(&state, run_id).await?;
    let mut flow = run.lock().await;
    let questions = flow.start(state.questions.as_ref()).await?.to_vec();
    Ok(Json(StartResponse {
        run_id,
        phase: flow.phase(),
        questions,
    }))
}

pub async fn handle_run_snapshot(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<RunSnapshot>, AppError> {
    let run = load_run(&state, run_id).await?;
    let flow = run.lock().await;
    Ok(Json(flow.snapshot()))
}

pub async fn handle_career_answer(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
    Json(pick): Json<CareerPick>,
) -> Result<Json<CareerAdvance>, AppError> {
    let run = load_run(&state, run_id).await?;
    let mut flow = run.lock().await;
    Ok(Json(flow.answer_career(pick)?))
}

pub async fn handle_begin_sessions(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<SessionLaunchResponse>, AppError> {
    let run = load_run(&state, run_id).await?;
    let mut flow = run.lock().await;
    let launch = flow.begin_skill_sessions(state.skill_api.as_ref()).await?;
    let snapshot = flow.snapshot();
    Ok(Json(SessionLaunchResponse {
        phase: snapshot.phase,
        started: launch.started,
        failures: launch.failures,
        technical: snapshot.technical,
        soft: snapshot.soft,
    }))
}

pub async fn handle_skill_answer(
    State(state): State<AppState>,
    Path((run_id, track)): Path<(Uuid, String)>,
    Json(req): Json<SkillAnswerRequest>,
) -> Result<Json<SkillAnswerResponse>, AppError> {
    let track: SkillTrack = track.parse().map_err(AppError::Validation)?;
    let run = load_run(&state, run_id).await?;
    let mut flow = run.lock().await;
    let advance = flow
        .answer_skill(
            state.skill_api.as_ref(),
            state.results.as_ref(),
            track,
            &req.answer,
        )
        .await?;
    let result = (advance.phase == Phase::Finished || advance.persist_failed)
        .then(|| flow.result().cloned())
        .flatten();
    Ok(Json(SkillAnswerResponse {
        track: advance.track,
        next: advance.next,
        track_done: advance.track_done,
        phase: advance.phase,
        persist_failed: advance.persist_failed,
        result,
    }))
}

pub async fn handle_retry_persist(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<RetryPersistResponse>, AppError> {
    let run = load_run(&state, run_id).await?;
    let mut flow = run.lock().await;
    flow.retry_persist(state.results.as_ref()).await?;
    Ok(Json(RetryPersistResponse {
        run_id,
        phase: flow.phase(),
    }))
}

pub async fn handle_abandon_run(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.runs.remove(run_id).await {
        info!(%run_id, "assessment run abandoned");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "assessment run {run_id} not found"
        )))
    }
}

async fn load_run(state: &AppState, run_id: Uuid) -> Result<Arc<Mutex<FlowState>>, AppError> {
    state
        .runs
        .get(run_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("assessment run {run_id} not found")))
}
