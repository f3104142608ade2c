//! Job types and policies (C1 data model).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use forgework_core::JobId;
use serde::{Deserialize, Serialize};

/// Job lifecycle status.
///
/// `Completed`, `Failed`, `DeadLetter`, and `Cancelled` are terminal — no
/// outbound transitions are modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Retrying,
    Completed,
    Failed,
    DeadLetter,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::DeadLetter | JobStatus::Cancelled
        )
    }
}

/// Backoff shape for retry delay calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    Constant,
    Linear,
    Exponential,
}

/// Immutable per-process retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_retries: u32,
    pub strategy: BackoffStrategy,
    pub base_delay_ms: u64,
    pub max_delay_ms: Option<u64>,
    pub min_jitter_factor: f64,
    pub max_jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            strategy: BackoffStrategy::Exponential,
            base_delay_ms: 5_000,
            max_delay_ms: Some(300_000),
            min_jitter_factor: 0.0,
            max_jitter_factor: 0.2,
        }
    }
}

impl RetryPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn fixed(max_retries: u32, delay_ms: u64) -> Self {
        Self {
            enabled: true,
            max_retries,
            strategy: BackoffStrategy::Constant,
            base_delay_ms: delay_ms,
            max_delay_ms: Some(delay_ms),
            min_jitter_factor: 0.0,
            max_jitter_factor: 0.0,
        }
    }
}

/// One recorded execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobAttemptRecord {
    pub attempt_number: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub error_message: Option<String>,
    pub exception_type: Option<String>,
    pub duration_ms: u64,
    pub delay_before_ms: u64,
    pub strategy: BackoffStrategy,
}

/// A background job and its full status record.
///
/// The queue borrows a job only while it is pending; the status store owns
/// the authoritative copy (including history) for the job's whole life.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub status: JobStatus,
    pub source: Option<String>,
    pub idempotency_key: Option<String>,
    pub metadata: HashMap<String, String>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub last_error: Option<String>,
    pub last_exception_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub history: Vec<JobAttemptRecord>,
    /// The delay the retry timer actually waited before re-offering this
    /// job, carried from `schedule_retry` through to the next attempt's
    /// history entry. `None` for a job's first attempt.
    pub pending_delay_ms: Option<u64>,
}

impl Job {
    pub fn new(job_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: JobId::new(),
            job_type: job_type.into(),
            payload,
            status: JobStatus::Queued,
            source: None,
            idempotency_key: None,
            metadata: HashMap::new(),
            retry_count: 0,
            max_retries: 0,
            last_error: None,
            last_exception_type: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            history: Vec::new(),
            pending_delay_ms: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if !key.is_empty() {
            self.idempotency_key = Some(key);
        }
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// `AttemptNumber` strictly increases and equals `retry_count + 1` once
    /// at least one execution has run.
    pub fn attempt_number(&self) -> u32 {
        self.retry_count + 1
    }
}

/// What a job handler returns for one execution attempt.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Success,
    Failure {
        error_message: String,
        exception_type: Option<String>,
        should_retry: bool,
    },
}

impl JobOutcome {
    pub fn failure(error_message: impl Into<String>, should_retry: bool) -> Self {
        Self::Failure {
            error_message: error_message.into(),
            exception_type: None,
            should_retry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_number_tracks_retry_count() {
        let mut job = Job::new("plan", serde_json::json!({}));
        assert_eq!(job.attempt_number(), 1);
        job.retry_count = 2;
        assert_eq!(job.attempt_number(), 3);
    }

    #[test]
    fn empty_idempotency_key_is_not_registered() {
        let job = Job::new("plan", serde_json::json!({})).with_idempotency_key("");
        assert!(job.idempotency_key.is_none());
    }

    #[test]
    fn terminal_statuses_are_exactly_the_four_named() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::DeadLetter.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(!JobStatus::Retrying.is_terminal());
    }
}
