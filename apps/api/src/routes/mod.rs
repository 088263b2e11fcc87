pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::assessment::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Assessment run API
        .route("/api/v1/assessments", post(handlers::handle_create_run))
        .route(
            "/api/v1/assessments/:id",
            get(handlers::handle_run_snapshot).delete(handlers::handle_abandon_run),
        )
        .route("/api/v1/assessments/:id/start", post(handlers::handle_start))
        .route(
            "/api/v1/assessments/:id/career-answers",
            post(handlers::handle_career_answer),
        )
        .route(
            "/api/v1/assessments/:id/skill-sessions",
            post(handlers::handle_begin_sessions),
        )
        .route(
            "/api/v1/assessments/:id/skill-sessions/:track/answers",
            post(handlers::handle_skill_answer),
        )
        .route(
            "/api/v1/assessments/:id/result/retry",
            post(handlers::handle_retry_persist),
        )
        .with_state(state)
}
