//! Administrative review routes, mounted under `/admin`

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use common::jobs::JobKind;
use matching::review;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{
        jobs::{JobAccepted, JobResponse},
        matches::PotentialMatchQuery,
    },
    routes::enqueue_notifications,
};

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/matches", get(list_potential_matches))
        .route("/matches/generate", post(queue_generation))
        .route("/matches/:id/confirm", post(confirm_match))
        .route("/matches/:id/reject", post(reject_match))
        .route("/jobs/:id", get(get_job))
}

/// Potential matches with pagination and an optional status filter
pub async fn list_potential_matches(
    State(state): State<AppState>,
    Query(query): Query<PotentialMatchQuery>,
) -> ApiResult<impl IntoResponse> {
    let status = query.status_filter()?;
    let page = review::list(state.store.as_ref(), status, query.page, query.limit).await?;
    Ok(Json(page))
}

pub async fn confirm_match(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let confirmed = review::confirm(state.store.as_ref(), id).await?;
    info!(admin = %admin.id, potential_match_id = %id, "Potential match confirmed");

    enqueue_notifications(&state, review::confirmation_notifications(&confirmed)).await;
    Ok(Json(confirmed))
}

pub async fn reject_match(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let rejected = review::reject(state.store.as_ref(), id).await?;
    info!(admin = %admin.id, potential_match_id = %id, "Potential match rejected");
    Ok(Json(rejected))
}

/// Queue a generation run for the worker
pub async fn queue_generation(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let job = state
        .jobs
        .enqueue(
            JobKind::GenerateMatches,
            json!({ "requested_by": admin.id }),
            state.job_settings.max_attempts,
        )
        .await?;

    Ok((StatusCode::ACCEPTED, Json(JobAccepted { job_id: job.id })))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let job = state
        .jobs
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;

    Ok(Json(JobResponse::from(job)))
}
