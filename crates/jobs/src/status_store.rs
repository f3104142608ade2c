//! Status store (C3): persists job records, filters/paginates, aggregates
//! metrics.
//!
//! `InMemoryStatusStore` is grounded in the teacher's `InMemoryJobStore`
//! (`infra/src/jobs/store.rs`), with `parking_lot::RwLock` in place of
//! `std::sync::RwLock` (already a workspace dependency, used elsewhere for
//! the same reason: no poisoning to thread through every call site).

use std::collections::HashMap;

use forgework_core::JobId;
use parking_lot::RwLock;
use thiserror::Error;

use crate::types::{Job, JobStatus};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatusStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// A filter/paginate query against the stored population.
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    pub status: Option<JobStatus>,
    pub job_type: Option<String>,
    pub source: Option<String>,
    pub skip: usize,
    pub take: usize,
}

/// Aggregate counts across the stored population.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StatusMetrics {
    pub total: usize,
    pub by_status: HashMap<JobStatus, usize>,
    pub by_type: HashMap<String, TypeMetrics>,
    pub dead_lettered: usize,
}

/// Per-type success/failure breakdown. `DeadLetter` outcomes are excluded
/// here and tracked only as `StatusMetrics::dead_lettered`, since whether a
/// dead-lettered job should count as a "failure" for this type is
/// ambiguous and the spec this store fulfills fixes it to "exclude".
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct TypeMetrics {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[async_trait::async_trait]
pub trait StatusStore: Send + Sync {
    async fn set(&self, job: Job) -> Result<(), StatusStoreError>;
    async fn get(&self, job_id: JobId) -> Result<Option<Job>, StatusStoreError>;
    async fn list(&self, query: JobQuery) -> Result<Vec<Job>, StatusStoreError>;
    async fn metrics(&self) -> Result<StatusMetrics, StatusStoreError>;
    async fn list_dead_letters(&self, skip: usize, take: usize) -> Result<Vec<Job>, StatusStoreError>;
}

/// Hash serde::Serialize-able HashMap key requires Hash on JobStatus, which
/// is already derived in `types`.
#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn set(&self, job: Job) -> Result<(), StatusStoreError> {
        self.jobs.write().insert(job.id, job);
        Ok(())
    }

    async fn get(&self, job_id: JobId) -> Result<Option<Job>, StatusStoreError> {
        Ok(self.jobs.read().get(&job_id).cloned())
    }

    async fn list(&self, query: JobQuery) -> Result<Vec<Job>, StatusStoreError> {
        let jobs = self.jobs.read();
        let mut result: Vec<_> = jobs
            .values()
            .filter(|j| query.status.is_none_or(|s| j.status == s))
            .filter(|j| query.job_type.as_deref().is_none_or(|t| j.job_type == t))
            .filter(|j| query.source.as_deref().is_none_or(|s| j.source.as_deref() == Some(s)))
            .cloned()
            .collect();

        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let take = if query.take == 0 { result.len() } else { query.take };
        Ok(result.into_iter().skip(query.skip).take(take).collect())
    }

    async fn metrics(&self) -> Result<StatusMetrics, StatusStoreError> {
        let jobs = self.jobs.read();
        let mut metrics = StatusMetrics {
            total: jobs.len(),
            ..Default::default()
        };

        for job in jobs.values() {
            *metrics.by_status.entry(job.status).or_insert(0) += 1;

            if job.status == JobStatus::DeadLetter {
                metrics.dead_lettered += 1;
                continue;
            }

            let type_metrics = metrics.by_type.entry(job.job_type.clone()).or_default();
            type_metrics.total += 1;
            match job.status {
                JobStatus::Completed => type_metrics.succeeded += 1,
                JobStatus::Failed | JobStatus::Cancelled => type_metrics.failed += 1,
                _ => {}
            }
        }

        Ok(metrics)
    }

    async fn list_dead_letters(&self, skip: usize, take: usize) -> Result<Vec<Job>, StatusStoreError> {
        self.list(JobQuery {
            status: Some(JobStatus::DeadLetter),
            skip,
            take,
            ..Default::default()
        })
        .await
    }
}

/// Stubbed Postgres-backed store. Not implemented; exists so the trait seam
/// is honest about what persistence backend a deployment can choose without
/// requiring a live database to build or test the in-memory default.
#[cfg(feature = "postgres")]
pub struct PostgresStatusStore;

#[cfg(feature = "postgres")]
#[async_trait::async_trait]
impl StatusStore for PostgresStatusStore {
    async fn set(&self, _job: Job) -> Result<(), StatusStoreError> {
        Err(StatusStoreError::Storage("not yet implemented".into()))
    }

    async fn get(&self, _job_id: JobId) -> Result<Option<Job>, StatusStoreError> {
        Err(StatusStoreError::Storage("not yet implemented".into()))
    }

    async fn list(&self, _query: JobQuery) -> Result<Vec<Job>, StatusStoreError> {
        Err(StatusStoreError::Storage("not yet implemented".into()))
    }

    async fn metrics(&self) -> Result<StatusMetrics, StatusStoreError> {
        Err(StatusStoreError::Storage("not yet implemented".into()))
    }

    async fn list_dead_letters(&self, _skip: usize, _take: usize) -> Result<Vec<Job>, StatusStoreError> {
        Err(StatusStoreError::Storage("not yet implemented".into()))
    }
}
