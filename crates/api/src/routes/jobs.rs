use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use forgework_core::JobId;
use forgework_jobs::JobQuery;

use crate::dto::{CancelResponse, JobListQuery, PageQuery};
use crate::errors::{json_error, ApiError};
use crate::state::AppState;

pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobListQuery>,
) -> Result<Response, ApiError> {
    let jobs = state
        .status_store
        .list(JobQuery {
            status: query.status,
            job_type: query.job_type,
            source: query.source,
            skip: query.skip,
            take: query.take,
        })
        .await?;
    Ok(Json(jobs).into_response())
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let metrics = state.status_store.metrics().await?;
    Ok(Json(metrics).into_response())
}

pub async fn dead_letter(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    let jobs = state.status_store.list_dead_letters(query.skip, query.take).await?;
    Ok(Json(jobs).into_response())
}

pub async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<JobId>,
) -> Result<Response, ApiError> {
    match state.status_store.get(job_id).await? {
        Some(job) => Ok(Json(job).into_response()),
        None => Ok(json_error(StatusCode::NOT_FOUND, "job_not_found", "no such job")),
    }
}

pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<JobId>,
) -> Result<Response, ApiError> {
    let cancelled = state.dispatcher.cancel(job_id).await?;
    if cancelled {
        Ok(Json(CancelResponse { cancelled: true }).into_response())
    } else {
        Ok(json_error(
            StatusCode::NOT_FOUND,
            "job_not_cancellable",
            "job is unknown or already terminal",
        ))
    }
}
