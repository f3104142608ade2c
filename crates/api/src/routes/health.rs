use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::health::{self, HealthStatus};
use crate::state::AppState;

/// Plain liveness check: if the process can answer HTTP at all, it's OK.
pub async fn health() -> &'static str {
    "OK"
}

/// Aggregated health from every registered probe; 503 iff any is
/// `Unhealthy`.
pub async fn health_detailed(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (overall, results) = health::run_all(&state.health_probes).await;
    let status = match overall {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (
        status,
        Json(json!({
            "status": overall,
            "probes": results,
        })),
    )
}
