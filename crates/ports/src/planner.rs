//! The LLM planning service port.
//!
//! The core never talks to a model provider directly; it calls through this
//! trait. The calling job handler decides whether a `PlanningError` is
//! transient (retry) or permanent (fail), matching the rest of the job
//! subsystem's "handler decides retryability" convention.

use async_trait::async_trait;
use forgework_core::Plan;
use thiserror::Error;

/// Input to plan synthesis for one labeled issue.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub issue_title: String,
    pub issue_body: String,
    pub repository_summary: Option<String>,
    pub instructions_markdown: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanningError {
    #[error("planning request timed out or the model provider was unavailable: {0}")]
    Transient(String),
    #[error("planning request was rejected: {0}")]
    Permanent(String),
}

impl PlanningError {
    /// Whether the job handler calling this port should treat the failure
    /// as retryable.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

#[async_trait]
pub trait PlanningService: Send + Sync {
    async fn create_plan(&self, request: PlanRequest) -> Result<Plan, PlanningError>;
}
