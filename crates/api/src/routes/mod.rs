pub mod health;
pub mod jobs;
pub mod webhook;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// The full router: `/health*` unauthenticated liveness, `/webhook` the
/// signature-validated ingress, `/jobs*` the operator query/cancel surface.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/detailed", get(health::health_detailed))
        .route("/webhook", post(webhook::handle_webhook))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/metrics", get(jobs::metrics))
        .route("/jobs/dead-letter", get(jobs::dead_letter))
        .route("/jobs/:job_id/status", get(jobs::job_status))
        .route("/jobs/:job_id/cancel", post(jobs::cancel_job))
        .with_state(state)
}
