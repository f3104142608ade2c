//! Processor (C6): drains the queue with bounded concurrency, invokes the
//! registered handler, applies retry/dead-letter policy, and keeps the
//! status store and bound agent task in sync.
//!
//! Generalizes the teacher's OS-thread `executor_loop`
//! (`infra/src/jobs/executor.rs`) to `tokio::spawn` worker loops and
//! `tokio_util::sync::CancellationToken` cooperative cancellation: a
//! thread blocked on a handler call cannot be interrupted mid-execution,
//! but a handler that polls its token can surrender promptly, which the
//! processor's cancellation contract requires.

use std::sync::Arc;

use chrono::Utc;
use forgework_tasks::{TaskStatus, TaskStore};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dedup::DeduplicationService;
use crate::dispatcher::Dispatcher;
use crate::handler::HandlerRegistry;
use crate::queue::JobQueue;
use crate::retry::{next_delay, should_retry, JitterSource, RandJitterSource};
use crate::status_store::StatusStore;
use crate::types::{Job, JobAttemptRecord, JobOutcome, JobStatus, RetryPolicy};

pub struct ProcessorConfig {
    pub max_concurrency: usize,
    pub retry_policy: RetryPolicy,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            retry_policy: RetryPolicy::default(),
        }
    }
}

pub struct Processor {
    queue: Arc<JobQueue>,
    status_store: Arc<dyn StatusStore>,
    dedup: Arc<DeduplicationService>,
    handlers: Arc<Mutex<HandlerRegistry>>,
    dispatcher: Arc<Dispatcher>,
    task_store: Arc<dyn TaskStore>,
    config: ProcessorConfig,
    jitter: Arc<dyn JitterSource>,
}

impl Processor {
    pub fn new(
        queue: Arc<JobQueue>,
        status_store: Arc<dyn StatusStore>,
        dedup: Arc<DeduplicationService>,
        handlers: Arc<Mutex<HandlerRegistry>>,
        dispatcher: Arc<Dispatcher>,
        task_store: Arc<dyn TaskStore>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            queue,
            status_store,
            dedup,
            handlers,
            dispatcher,
            task_store,
            config,
            jitter: Arc::new(RandJitterSource),
        }
    }

    #[cfg(test)]
    pub fn with_jitter_source(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    /// Spawns `max_concurrency` worker loops. Each exits once `root_cancel`
    /// fires and its current attempt (if any) completes.
    pub fn run(self: Arc<Self>, root_cancel: CancellationToken) -> Vec<tokio::task::JoinHandle<()>> {
        (0..self.config.max_concurrency)
            .map(|worker_id| {
                let processor = self.clone();
                let root_cancel = root_cancel.clone();
                tokio::spawn(async move { processor.worker_loop(worker_id, root_cancel).await })
            })
            .collect()
    }

    async fn worker_loop(&self, worker_id: usize, root_cancel: CancellationToken) {
        loop {
            let Some(mut job) = self.queue.take(&root_cancel).await else {
                break;
            };

            // Reuse the token bound while the job sat in `Queued` (at
            // dispatch time, or after a retry timer re-offered it) rather
            // than allocating a fresh one here: a `Cancel` call racing the
            // `Take` must land on a token this attempt actually observes.
            // Jobs that entered the queue without going through the
            // dispatcher (only possible in tests that push directly) get a
            // token bound now as a fallback.
            let attempt_token = self
                .dispatcher
                .cancellation_token(job.id)
                .unwrap_or_else(|| self.dispatcher.bind_queued_token(job.id));

            if attempt_token.is_cancelled() {
                self.finish_cancelled(&mut job).await;
                continue;
            }

            debug!(worker = worker_id, job_id = %job.id, job_type = %job.job_type, "claimed job");
            self.process_one(&mut job, &attempt_token).await;
        }
    }

    async fn process_one(&self, job: &mut Job, attempt_token: &CancellationToken) {
        job.status = JobStatus::Processing;
        job.started_at.get_or_insert_with(Utc::now);
        job.max_retries = self.config.retry_policy.max_retries;
        if let Err(err) = self.status_store.set(job.clone()).await {
            warn!(job_id = %job.id, error = %err, "failed to record processing status");
        }

        let handler = self.handlers.lock().get(&job.job_type);
        let Some(handler) = handler else {
            job.last_error = Some(format!("no handler for job type: {}", job.job_type));
            self.finish_failed(job, false).await;
            return;
        };

        let started_at = Utc::now();
        let delay_before_ms = job.pending_delay_ms.take().unwrap_or(0);

        let outcome = handler.execute(job, attempt_token).await;
        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

        if attempt_token.is_cancelled() {
            self.append_attempt(
                job,
                started_at,
                finished_at,
                duration_ms,
                delay_before_ms,
                false,
                Some("cancelled".to_string()),
                None,
            );
            self.finish_cancelled(job).await;
            return;
        }

        match outcome {
            JobOutcome::Success => {
                self.append_attempt(
                    job,
                    started_at,
                    finished_at,
                    duration_ms,
                    delay_before_ms,
                    true,
                    None,
                    None,
                );
                self.finish_completed(job).await;
            }
            JobOutcome::Failure {
                error_message,
                exception_type,
                should_retry: handler_signaled_retry,
            } => {
                self.append_attempt(
                    job,
                    started_at,
                    finished_at,
                    duration_ms,
                    delay_before_ms,
                    false,
                    Some(error_message.clone()),
                    exception_type.clone(),
                );
                job.last_error = Some(error_message);
                job.last_exception_type = exception_type;

                if should_retry(&self.config.retry_policy, job.retry_count, handler_signaled_retry) {
                    self.schedule_retry(job.clone()).await;
                } else {
                    // Dead-letter only applies when the handler wanted a retry but the
                    // budget ran out; a handler-signaled `should_retry=false` is always
                    // a permanent `Failed`, even if retries happen to be exhausted too.
                    let budget_exhausted = job.retry_count >= self.config.retry_policy.max_retries;
                    if handler_signaled_retry && self.config.retry_policy.enabled && budget_exhausted {
                        self.finish_dead_lettered(job).await;
                    } else {
                        self.finish_failed(job, false).await;
                    }
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn append_attempt(
        &self,
        job: &mut Job,
        started_at: chrono::DateTime<Utc>,
        finished_at: chrono::DateTime<Utc>,
        duration_ms: u64,
        delay_before_ms: u64,
        success: bool,
        error_message: Option<String>,
        exception_type: Option<String>,
    ) {
        job.history.push(JobAttemptRecord {
            attempt_number: job.attempt_number(),
            started_at,
            finished_at,
            success,
            error_message,
            exception_type,
            duration_ms,
            delay_before_ms,
            strategy: self.config.retry_policy.strategy,
        });
    }

    async fn finish_completed(&self, job: &mut Job) {
        job.status = JobStatus::Completed;
        job.completed_at = Some(Utc::now());
        self.persist_and_release(job).await;
        self.bind_task_outcome(job, true).await;
    }

    async fn finish_failed(&self, job: &mut Job, retry_exhausted_by_policy: bool) {
        job.status = JobStatus::Failed;
        job.completed_at = Some(Utc::now());
        let _ = retry_exhausted_by_policy;
        self.persist_and_release(job).await;
        self.bind_task_outcome(job, false).await;
    }

    async fn finish_dead_lettered(&self, job: &mut Job) {
        job.status = JobStatus::DeadLetter;
        job.completed_at = Some(Utc::now());
        warn!(job_id = %job.id, error = ?job.last_error, "job dead-lettered");
        self.persist_and_release(job).await;
        self.bind_task_outcome(job, false).await;
    }

    async fn finish_cancelled(&self, job: &mut Job) {
        job.status = JobStatus::Cancelled;
        job.completed_at = Some(Utc::now());
        self.persist_and_release(job).await;
        self.bind_task_outcome(job, false).await;
    }

    async fn persist_and_release(&self, job: &Job) {
        if let Err(err) = self.status_store.set(job.clone()).await {
            warn!(job_id = %job.id, error = %err, "failed to persist terminal status");
        }
        self.dispatcher.release_cancellation_token(job.id);
        if job.idempotency_key.is_some() {
            self.dedup.unregister(job.id);
        }
    }

    /// Retrying doesn't block the worker: a timer task re-offers the job
    /// to the queue after the computed delay, and this worker loops back
    /// to `take` immediately.
    async fn schedule_retry(&self, mut job: Job) {
        job.retry_count += 1;
        job.status = JobStatus::Retrying;
        let delay_ms = next_delay(&self.config.retry_policy, job.retry_count - 1, self.jitter.as_ref());
        job.pending_delay_ms = Some(delay_ms);
        if let Err(err) = self.status_store.set(job.clone()).await {
            warn!(job_id = %job.id, error = %err, "failed to record retrying status");
        }

        let queue = self.queue.clone();
        let status_store = self.status_store.clone();
        let dispatcher = self.dispatcher.clone();
        let job_id = job.id;

        // Root-linked token covering the Retrying/pending-timer window
        // (not a bare `CancellationToken::new()`): a `Cancel` arriving
        // before the timer fires must be observable, and shutdown must be
        // able to trip it like any other in-flight job.
        let retry_token = dispatcher.bind_queued_token(job_id);

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(std::time::Duration::from_millis(delay_ms)) => {
                    // The wait is over and the job goes back in the queue:
                    // rebind a fresh token for that new `Queued` period so
                    // the stale wait-token isn't left as the only thing a
                    // `Cancel` could find.
                    dispatcher.bind_queued_token(job_id);
                    queue.offer(job).await;
                }
                _ = retry_token.cancelled() => {
                    dispatcher.release_cancellation_token(job_id);
                    if let Ok(Some(mut stored)) = status_store.get(job_id).await {
                        stored.status = JobStatus::Cancelled;
                        stored.completed_at = Some(Utc::now());
                        let _ = status_store.set(stored).await;
                    }
                }
            }
        });
    }

    /// Propagates a job's terminal outcome to the `AgentTask` named by its
    /// `task_id` metadata key, if any. Mirrors the teacher's event-bus
    /// subscriber reacting to a completed unit of work, kept as a plain
    /// in-process call since the processor already holds both the outcome
    /// and the task id.
    async fn bind_task_outcome(&self, job: &Job, succeeded: bool) {
        let Some(task_id_raw) = job.metadata.get("task_id") else {
            return;
        };
        let Ok(task_id) = task_id_raw.parse::<forgework_core::TaskId>() else {
            warn!(job_id = %job.id, task_id = %task_id_raw, "job carries an unparsable task_id");
            return;
        };

        let Ok(Some(mut task)) = self.task_store.get(&task_id).await else {
            return;
        };

        let next = match (job.job_type.as_str(), succeeded, job.status) {
            ("plan", true, _) => TaskStatus::Planned,
            (_, true, _) => TaskStatus::Completed,
            (_, false, JobStatus::Cancelled) => TaskStatus::Cancelled,
            (_, false, _) => TaskStatus::Failed,
        };

        if !task.transition_to(next) {
            return;
        }
        if !succeeded {
            task.error = job.last_error.clone();
        }
        if let Err(err) = self.task_store.update(task).await {
            warn!(job_id = %job.id, task_id = %task_id_raw, error = %err, "failed to update bound task");
        }
        info!(job_id = %job.id, task_id = %task_id_raw, "updated bound task from job outcome");
    }
}
