//! Dispatcher (C5): admits jobs, enqueues them, records the initial
//! `Queued` status, and cancels in-flight work on request.

use std::collections::HashMap;
use std::sync::Arc;

use forgework_core::JobId;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::dedup::DeduplicationService;
use crate::handler::HandlerRegistry;
use crate::queue::JobQueue;
use crate::status_store::{StatusStore, StatusStoreError};
use crate::types::{Job, JobStatus};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Store(#[from] StatusStoreError),
}

pub struct Dispatcher {
    queue: Arc<JobQueue>,
    status_store: Arc<dyn StatusStore>,
    dedup: Arc<DeduplicationService>,
    handlers: Arc<Mutex<HandlerRegistry>>,
    root_cancel: CancellationToken,
    cancellation_tokens: Mutex<HashMap<JobId, CancellationToken>>,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<JobQueue>,
        status_store: Arc<dyn StatusStore>,
        dedup: Arc<DeduplicationService>,
        handlers: Arc<Mutex<HandlerRegistry>>,
        root_cancel: CancellationToken,
    ) -> Self {
        Self {
            queue,
            status_store,
            dedup,
            handlers,
            root_cancel,
            cancellation_tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Registers the cancellation token the processor allocates for a job's
    /// current attempt, so a later `Cancel` call can reach it. Overwrites
    /// any prior token for the same job (a fresh attempt gets a fresh
    /// token).
    pub fn bind_cancellation_token(&self, job_id: JobId, token: CancellationToken) {
        self.cancellation_tokens.lock().insert(job_id, token);
    }

    /// Binds a fresh token (a child of the process root) for a job that is
    /// about to sit in `Queued` state, and returns it. A job must have a
    /// live, reachable token for every moment it is non-terminal — not just
    /// while a worker holds it mid-attempt — so every transition back into
    /// `Queued` (initial dispatch, or a retry timer re-offering the job)
    /// goes through this rather than leaving the job briefly uncancellable.
    pub fn bind_queued_token(&self, job_id: JobId) -> CancellationToken {
        let token = self.root_cancel.child_token();
        self.bind_cancellation_token(job_id, token.clone());
        token
    }

    /// The token currently bound for `job_id`, if any.
    pub fn cancellation_token(&self, job_id: JobId) -> Option<CancellationToken> {
        self.cancellation_tokens.lock().get(&job_id).cloned()
    }

    pub fn release_cancellation_token(&self, job_id: JobId) {
        self.cancellation_tokens.lock().remove(&job_id);
    }

    /// Admits and enqueues `job`. Returns `true` iff the job was queued.
    pub async fn dispatch(&self, mut job: Job) -> Result<bool, DispatchError> {
        if !self.handlers.lock().contains(&job.job_type) {
            job.status = JobStatus::Failed;
            job.last_error = Some("no handler".to_string());
            job.completed_at = Some(chrono::Utc::now());
            self.status_store.set(job).await?;
            return Ok(false);
        }

        if let Some(key) = job.idempotency_key.clone() {
            if self.dedup.get_in_flight(&key).is_some() {
                return Ok(false);
            }
            if !self.dedup.register(job.id, &key) {
                return Ok(false);
            }
        }

        // Bind before offering: once `offer` succeeds a waiting worker may
        // `Take` the job immediately, and its cancellation token must
        // already be reachable rather than racing the worker for the bind.
        self.bind_queued_token(job.id);

        if !self.queue.offer(job.clone()).await {
            if job.idempotency_key.is_some() {
                self.dedup.unregister(job.id);
            }
            self.release_cancellation_token(job.id);
            job.status = JobStatus::Failed;
            job.last_error = Some("queue full".to_string());
            job.completed_at = Some(chrono::Utc::now());
            self.status_store.set(job).await?;
            return Ok(false);
        }

        job.status = JobStatus::Queued;
        self.status_store.set(job).await?;
        Ok(true)
    }

    /// Best-effort cooperative cancellation. Returns `true` iff a
    /// cancellation token was found and signaled.
    pub async fn cancel(&self, job_id: JobId) -> Result<bool, DispatchError> {
        let job = match self.status_store.get(job_id).await? {
            Some(job) => job,
            None => return Ok(false),
        };

        if !matches!(
            job.status,
            JobStatus::Queued | JobStatus::Processing | JobStatus::Retrying
        ) {
            return Ok(false);
        }

        if let Some(token) = self.cancellation_tokens.lock().get(&job_id).cloned() {
            token.cancel();
            return Ok(true);
        }

        Ok(false)
    }
}
