#![allow(dead_code)]

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::assessment::flow::FlowError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Result save failed: {0}")]
    ResultSave(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Upstream(msg) => {
                tracing::error!("Upstream error: {msg}");
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::ResultSave(msg) => {
                tracing::error!("Result save failed: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "RESULT_SAVE_FAILED",
                    "The assessment result could not be saved; it is retained and can be retried"
                        .to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

impl From<FlowError> for AppError {
    fn from(err: FlowError) -> Self {
        let message = err.to_string();
        match err {
            FlowError::QuestionFetch(_)
            | FlowError::SessionsUnavailable { .. }
            | FlowError::Submission { .. } => AppError::Upstream(message),
            FlowError::Persist(_) => AppError::ResultSave(message),
            FlowError::StaleQuestion { .. } | FlowError::UnknownOption { .. } => {
                AppError::Validation(message)
            }
            FlowError::WrongPhase { .. }
            | FlowError::SessionsAlreadyStarted
            | FlowError::SessionComplete { .. }
            | FlowError::NoActiveSession { .. }
            | FlowError::NoPendingQuestion
            | FlowError::NothingToSave => AppError::Conflict(message),
        }
    }
}
