use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{body::Bytes, Json};
use serde_json::json;

use forgework_webhook::WebhookOutcome;

use crate::dto::{WebhookAcceptedResponse, WebhookIgnoredResponse};
use crate::errors::ApiError;
use crate::state::AppState;

/// Strips CR/LF from a raw header value before it reaches a log line, per
/// the spec's log-forging defense for any user-provided identifier echoed
/// into logs.
fn sanitize_for_log(value: &str) -> String {
    value.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

pub async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let event_type = headers
        .get("X-GitHub-Event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let signature = headers
        .get("X-Hub-Signature-256")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let delivery_id = headers
        .get("X-GitHub-Delivery")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    tracing::info!(
        event_type = %sanitize_for_log(&event_type),
        delivery_id = delivery_id.as_deref().map(sanitize_for_log).unwrap_or_default(),
        "webhook received"
    );

    let outcome = state
        .webhook
        .handle(&event_type, signature.as_deref(), delivery_id.as_deref(), &body)
        .await?;

    Ok(match outcome {
        WebhookOutcome::PlanningJobDispatched { job_id, .. } => (
            StatusCode::ACCEPTED,
            Json(WebhookAcceptedResponse {
                job_id,
                status_url: format!("/jobs/{job_id}/status"),
            }),
        )
            .into_response(),
        WebhookOutcome::Ignored => {
            (StatusCode::OK, Json(WebhookIgnoredResponse { status: "ignored" })).into_response()
        }
        WebhookOutcome::UninstallCascaded {
            tasks_cancelled,
            jobs_cancel_signalled,
        } => (
            StatusCode::OK,
            Json(json!({
                "status": "uninstall_cascaded",
                "tasks_cancelled": tasks_cancelled,
                "jobs_cancel_signalled": jobs_cancel_signalled,
            })),
        )
            .into_response(),
    })
}
