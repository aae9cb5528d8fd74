//! Custom error types for the API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use matching::{GenerateError, MatchingError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub const GENERATION_FAILED: &str = "Could not determine matches";
pub const GENERATION_UNREADABLE: &str = "Could not determine matches: the model returned an unreadable match list";

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or invalid bearer token
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated but not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Requested transition conflicts with the current state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A dependency such as the model provider failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] common::error::DatabaseError),
}

impl From<MatchingError> for ApiError {
    fn from(err: MatchingError) -> Self {
        match err {
            MatchingError::NotFound => ApiError::NotFound("Match not found".to_string()),
            MatchingError::NotParty => {
                ApiError::Forbidden("You are not a party to this match".to_string())
            }
            MatchingError::InvalidTransition { from } => {
                ApiError::Conflict(format!("Match is already {from}"))
            }
            MatchingError::Store(e) => ApiError::Database(e),
        }
    }
}

impl From<GenerateError> for ApiError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::Llm(_) => ApiError::Upstream(GENERATION_FAILED.to_string()),
            GenerateError::Parse(_) => ApiError::Upstream(GENERATION_UNREADABLE.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Database(e) => {
                error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
