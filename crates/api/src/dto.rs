//! Request/response shapes for the HTTP surface.
//!
//! `Job`, `JobAttemptRecord`, and `StatusMetrics` already derive `Serialize`
//! in `forgework-jobs`, so routes return them directly rather than through
//! a parallel view type — there's nothing this layer would add by copying
//! every field into a second struct.

use serde::Deserialize;

use forgework_core::JobId;
use forgework_jobs::JobStatus;

/// Query parameters for `GET /jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListQuery {
    pub status: Option<JobStatus>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub source: Option<String>,
    #[serde(default)]
    pub skip: usize,
    #[serde(default)]
    pub take: usize,
}

/// Query parameters for `GET /jobs/dead-letter`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub skip: usize,
    #[serde(default)]
    pub take: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct WebhookAcceptedResponse {
    pub job_id: JobId,
    pub status_url: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct WebhookIgnoredResponse {
    pub status: &'static str,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}
