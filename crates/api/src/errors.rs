//! Consistent JSON error responses.
//!
//! `json_error` mirrors the teacher's `app::errors::json_error` shape
//! exactly (status, a machine-readable code, a human message); `ApiError`
//! maps every failure domain this surface can produce (webhook rejection,
//! store errors) onto it in one place.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use forgework_jobs::StatusStoreError;
use forgework_tasks::TaskStoreError;
use forgework_webhook::WebhookError;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Webhook(#[from] WebhookError),
    #[error(transparent)]
    Store(#[from] StatusStoreError),
    #[error(transparent)]
    Task(#[from] TaskStoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Webhook(WebhookError::InvalidSignature(e)) => {
                json_error(StatusCode::UNAUTHORIZED, "invalid_signature", e.to_string())
            }
            ApiError::Webhook(WebhookError::MalformedPayload(msg)) => {
                json_error(StatusCode::BAD_REQUEST, "malformed_payload", msg)
            }
            ApiError::Webhook(err) => {
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "webhook_error", err.to_string())
            }
            ApiError::Store(err) => {
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
            }
            ApiError::Task(err) => {
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "task_store_error", err.to_string())
            }
        }
    }
}
