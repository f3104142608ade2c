//! Webhook handler (C8): validates signature, parses the event, and either
//! dispatches a planning job for a labeled issue or cancels active work on
//! uninstall.
//!
//! The handler never calls the LLM planner or container manager directly —
//! it only writes to the task store and publishes jobs through the
//! dispatcher, per the spec's "sole entry point that writes to the task
//! store from the ingress boundary" contract.

use std::sync::Arc;

use forgework_core::TaskId;
use forgework_jobs::{Dispatcher, DispatchError, Job, JobQuery, JobStatus, StatusStore, StatusStoreError};
use forgework_ports::{AuditEvent, AuditSink};
use forgework_tasks::{AgentTask, TaskStatus, TaskStore, TaskStoreError};
use uuid::Uuid;

use crate::payload::{InstallationEvent, IssuesEvent};
use crate::signature::{self, SignatureError};

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error(transparent)]
    InvalidSignature(#[from] SignatureError),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Store(#[from] StatusStoreError),
    #[error(transparent)]
    Task(#[from] TaskStoreError),
}

/// What handling a webhook request produced, for the HTTP layer to map to a
/// status code.
#[derive(Debug, Clone)]
pub enum WebhookOutcome {
    /// A planning job was dispatched for a newly-labeled issue.
    PlanningJobDispatched { job_id: forgework_core::JobId, task_id: TaskId },
    /// The event was recognized but didn't trigger any action (wrong label,
    /// unsupported action, non-`deleted` installation action, duplicate
    /// delivery).
    Ignored,
    /// An `installation.deleted` cascade ran and cancelled the given number
    /// of tasks and jobs.
    UninstallCascaded { tasks_cancelled: usize, jobs_cancel_signalled: usize },
}

/// Runtime configuration the handler needs beyond what's in the payload.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// HMAC secret for `X-Hub-Signature-256`. Empty disables validation.
    pub webhook_secret: String,
    /// The issue label that triggers planning.
    pub activation_label: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            webhook_secret: String::new(),
            activation_label: "forgework".to_string(),
        }
    }
}

pub struct WebhookHandler {
    config: WebhookConfig,
    dispatcher: Arc<Dispatcher>,
    status_store: Arc<dyn StatusStore>,
    task_store: Arc<dyn TaskStore>,
    audit: Arc<dyn AuditSink>,
}

impl WebhookHandler {
    pub fn new(
        config: WebhookConfig,
        dispatcher: Arc<Dispatcher>,
        status_store: Arc<dyn StatusStore>,
        task_store: Arc<dyn TaskStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config,
            dispatcher,
            status_store,
            task_store,
            audit,
        }
    }

    /// Handles one ingress request. `event_type` is the `X-GitHub-Event`
    /// header value; `signature_header` is the raw `X-Hub-Signature-256`
    /// header value, if present; `body` is the raw request body bytes
    /// (signed over verbatim, before any JSON parsing).
    pub async fn handle(
        &self,
        event_type: &str,
        signature_header: Option<&str>,
        delivery_id: Option<&str>,
        body: &[u8],
    ) -> Result<WebhookOutcome, WebhookError> {
        let started = chrono::Utc::now();
        signature::verify(&self.config.webhook_secret, signature_header, body)?;

        let correlation_id = delivery_id
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::now_v7().to_string());

        let outcome = match event_type {
            "issues" => self.handle_issues(body, &correlation_id).await,
            "installation" => self.handle_installation(body, &correlation_id).await,
            _ => Ok(WebhookOutcome::Ignored),
        };

        self.audit.record(
            AuditEvent::new("webhook.handled", correlation_id)
                .with_duration_ms(forgework_core::time::duration_ms(started, chrono::Utc::now()))
                .with_metadata(serde_json::json!({
                    "event_type": event_type,
                    "outcome": outcome.as_ref().map(outcome_label).unwrap_or("error"),
                })),
        );

        outcome
    }

    async fn handle_issues(&self, body: &[u8], correlation_id: &str) -> Result<WebhookOutcome, WebhookError> {
        let event: IssuesEvent =
            serde_json::from_slice(body).map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

        if event.action != "labeled" {
            return Ok(WebhookOutcome::Ignored);
        }
        let Some(label) = &event.label else {
            return Ok(WebhookOutcome::Ignored);
        };
        if label.name != self.config.activation_label {
            return Ok(WebhookOutcome::Ignored);
        }

        let task_id = TaskId::new(&event.repository.owner.login, &event.repository.name, event.issue.number);
        self.upsert_pending_planning_task(&task_id, &event).await?;

        let payload = serde_json::json!({
            "taskId": task_id.to_string(),
            "installationId": event.installation.id,
            "issueTitle": event.issue.title,
            "issueBody": event.issue.body,
        });

        let job = Job::new("plan", payload)
            .with_idempotency_key(format!("plan:{task_id}"))
            .with_source("webhook")
            .with_metadata("task_id", task_id.to_string())
            .with_metadata("installation_id", event.installation.id.to_string())
            .with_metadata("correlation_id", correlation_id);
        let job_id = job.id;

        if self.dispatcher.dispatch(job).await? {
            Ok(WebhookOutcome::PlanningJobDispatched { job_id, task_id })
        } else {
            Ok(WebhookOutcome::Ignored)
        }
    }

    async fn upsert_pending_planning_task(&self, task_id: &TaskId, event: &IssuesEvent) -> Result<(), WebhookError> {
        let existing = self.task_store.get(task_id).await?;
        let task = match existing {
            Some(mut task) => {
                task.status = TaskStatus::PendingPlanning;
                task.plan = None;
                task.error = None;
                task.started_at = None;
                task.completed_at = None;
                task
            }
            None => AgentTask::new(
                task_id.clone(),
                event.installation.id,
                &event.repository.owner.login,
                &event.repository.name,
                event.issue.number,
            ),
        };
        self.task_store.update(task).await?;
        Ok(())
    }

    async fn handle_installation(&self, body: &[u8], correlation_id: &str) -> Result<WebhookOutcome, WebhookError> {
        let event: InstallationEvent =
            serde_json::from_slice(body).map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

        if event.action != "deleted" {
            return Ok(WebhookOutcome::Ignored);
        }

        let installation_id = event.installation.id;
        let tasks_cancelled = self.cancel_tasks_for_installation(installation_id).await?;
        let jobs_cancel_signalled = self.cancel_jobs_for_installation(installation_id).await?;

        tracing::info!(
            installation_id,
            correlation_id,
            tasks_cancelled,
            jobs_cancel_signalled,
            "uninstall cascade complete"
        );

        Ok(WebhookOutcome::UninstallCascaded {
            tasks_cancelled,
            jobs_cancel_signalled,
        })
    }

    async fn cancel_tasks_for_installation(&self, installation_id: u64) -> Result<usize, WebhookError> {
        let tasks = self.task_store.list_by_installation(installation_id).await?;
        let mut cancelled = 0;
        for mut task in tasks {
            if task.status.is_terminal() {
                continue;
            }
            if task.transition_to(TaskStatus::Cancelled) {
                self.task_store.update(task).await?;
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }

    /// Non-terminal statuses can only be `Queued`, `Processing`, or
    /// `Retrying` (the other four are terminal by definition), so this scans
    /// exactly those three buckets rather than the whole population.
    async fn cancel_jobs_for_installation(&self, installation_id: u64) -> Result<usize, WebhookError> {
        let installation_id = installation_id.to_string();
        let mut signalled = 0;
        for status in [JobStatus::Queued, JobStatus::Processing, JobStatus::Retrying] {
            let jobs = self
                .status_store
                .list(JobQuery {
                    status: Some(status),
                    ..Default::default()
                })
                .await?;
            for job in jobs {
                if job.metadata.get("installation_id").map(String::as_str) == Some(installation_id.as_str())
                    && self.dispatcher.cancel(job.id).await?
                {
                    signalled += 1;
                }
            }
        }
        Ok(signalled)
    }
}

fn outcome_label(outcome: &WebhookOutcome) -> &'static str {
    match outcome {
        WebhookOutcome::PlanningJobDispatched { .. } => "planning_job_dispatched",
        WebhookOutcome::Ignored => "ignored",
        WebhookOutcome::UninstallCascaded { .. } => "uninstall_cascaded",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgework_jobs::{DeduplicationService, HandlerRegistry, InMemoryStatusStore, JobOutcome};
    use forgework_ports::NullAuditSink;
    use forgework_tasks::InMemoryTaskStore;
    use parking_lot::Mutex;
    use tokio_util::sync::CancellationToken;

    struct StubPlanHandler;

    #[async_trait::async_trait]
    impl forgework_jobs::JobHandler for StubPlanHandler {
        fn job_type(&self) -> &str {
            "plan"
        }

        async fn execute(&self, _job: &Job, _cancel: &CancellationToken) -> JobOutcome {
            JobOutcome::Success
        }
    }

    fn harness() -> (WebhookHandler, Arc<dyn StatusStore>, Arc<dyn TaskStore>, Arc<Dispatcher>) {
        let queue = Arc::new(forgework_jobs::JobQueue::new(16));
        let status_store: Arc<dyn StatusStore> = Arc::new(InMemoryStatusStore::new());
        let dedup = Arc::new(DeduplicationService::new());
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(StubPlanHandler)).unwrap();
        let handlers = Arc::new(Mutex::new(registry));
        let dispatcher = Arc::new(Dispatcher::new(
            queue,
            status_store.clone(),
            dedup,
            handlers,
            CancellationToken::new(),
        ));
        let task_store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let handler = WebhookHandler::new(
            WebhookConfig::default(),
            dispatcher.clone(),
            status_store.clone(),
            task_store.clone(),
            Arc::new(NullAuditSink),
        );
        (handler, status_store, task_store, dispatcher)
    }

    fn issue_labeled_body(owner: &str, repo: &str, issue: u64, installation: u64, label: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "action": "labeled",
            "label": {"name": label},
            "issue": {"number": issue, "title": "t", "body": "b"},
            "repository": {"name": repo, "owner": {"login": owner}},
            "installation": {"id": installation},
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn labeled_issue_with_activation_label_dispatches_planning_job() {
        let (handler, _store, tasks, _dispatcher) = harness();
        let body = issue_labeled_body("acme", "widgets", 1, 7, "forgework");

        let outcome = handler.handle("issues", None, None, &body).await.unwrap();
        let task_id = TaskId::new("acme", "widgets", 1);

        match outcome {
            WebhookOutcome::PlanningJobDispatched { task_id: tid, .. } => assert_eq!(tid, task_id),
            other => panic!("expected PlanningJobDispatched, got {other:?}"),
        }

        let task = tasks.get(&task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::PendingPlanning);
    }

    #[tokio::test]
    async fn labeled_issue_with_wrong_label_is_ignored() {
        let (handler, _store, tasks, _dispatcher) = harness();
        let body = issue_labeled_body("acme", "widgets", 1, 7, "not-it");

        let outcome = handler.handle("issues", None, None, &body).await.unwrap();
        assert!(matches!(outcome, WebhookOutcome::Ignored));
        assert!(tasks.get(&TaskId::new("acme", "widgets", 1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn non_labeled_action_is_ignored() {
        let (handler, ..) = harness();
        let body = serde_json::to_vec(&serde_json::json!({
            "action": "closed",
            "issue": {"number": 1, "title": "t"},
            "repository": {"name": "widgets", "owner": {"login": "acme"}},
            "installation": {"id": 7},
        }))
        .unwrap();

        let outcome = handler.handle("issues", None, None, &body).await.unwrap();
        assert!(matches!(outcome, WebhookOutcome::Ignored));
    }

    #[tokio::test]
    async fn duplicate_delivery_is_ignored_not_redispatched() {
        let (handler, ..) = harness();
        let body = issue_labeled_body("acme", "widgets", 1, 7, "forgework");

        let first = handler.handle("issues", None, None, &body).await.unwrap();
        assert!(matches!(first, WebhookOutcome::PlanningJobDispatched { .. }));

        let second = handler.handle("issues", None, None, &body).await.unwrap();
        assert!(matches!(second, WebhookOutcome::Ignored));
    }

    #[tokio::test]
    async fn uninstall_cascade_cancels_non_terminal_tasks_and_jobs() {
        let (handler, status_store, tasks, dispatcher) = harness();

        let mut t1 = AgentTask::new(TaskId::new("acme", "a", 1), 7, "acme", "a", 1);
        t1.transition_to(TaskStatus::Planned);
        t1.transition_to(TaskStatus::Executing);
        tasks.create(t1).await.unwrap();

        let t2 = AgentTask::new(TaskId::new("acme", "b", 2), 7, "acme", "b", 2);
        tasks.create(t2).await.unwrap();

        let mut t3 = AgentTask::new(TaskId::new("acme", "c", 3), 7, "acme", "c", 3);
        t3.transition_to(TaskStatus::Failed);
        tasks.create(t3).await.unwrap();

        let t4 = AgentTask::new(TaskId::new("acme", "d", 4), 9, "acme", "d", 4);
        tasks.create(t4).await.unwrap();

        let mut job = Job::new("plan", serde_json::json!({})).with_metadata("installation_id", "7");
        job.status = JobStatus::Processing;
        let job_id = job.id;
        status_store.set(job).await.unwrap();
        // Bind a real token through the dispatcher, same as a worker holding
        // this job mid-attempt would, so the assertions below exercise the
        // actual signal path rather than a count that would be zero without it.
        let token = dispatcher.bind_queued_token(job_id);

        let body = serde_json::to_vec(&serde_json::json!({"action": "deleted", "installation": {"id": 7}})).unwrap();
        let outcome = handler.handle("installation", None, None, &body).await.unwrap();

        match outcome {
            WebhookOutcome::UninstallCascaded {
                tasks_cancelled,
                jobs_cancel_signalled,
            } => {
                assert_eq!(tasks_cancelled, 2);
                assert_eq!(jobs_cancel_signalled, 1);
            }
            other => panic!("expected UninstallCascaded, got {other:?}"),
        }
        assert!(token.is_cancelled());

        assert_eq!(
            tasks.get(&TaskId::new("acme", "a", 1)).await.unwrap().unwrap().status,
            TaskStatus::Cancelled
        );
        assert_eq!(
            tasks.get(&TaskId::new("acme", "b", 2)).await.unwrap().unwrap().status,
            TaskStatus::Cancelled
        );
        assert_eq!(
            tasks.get(&TaskId::new("acme", "c", 3)).await.unwrap().unwrap().status,
            TaskStatus::Failed
        );
        assert_eq!(
            tasks.get(&TaskId::new("acme", "d", 4)).await.unwrap().unwrap().status,
            TaskStatus::Executing
        );
    }

    #[tokio::test]
    async fn invalid_signature_is_rejected_before_any_mutation() {
        let queue = Arc::new(forgework_jobs::JobQueue::new(16));
        let status_store: Arc<dyn StatusStore> = Arc::new(InMemoryStatusStore::new());
        let dedup = Arc::new(DeduplicationService::new());
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(StubPlanHandler)).unwrap();
        let handlers = Arc::new(Mutex::new(registry));
        let dispatcher = Arc::new(Dispatcher::new(
            queue,
            status_store.clone(),
            dedup,
            handlers,
            CancellationToken::new(),
        ));
        let task_store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let handler = WebhookHandler::new(
            WebhookConfig {
                webhook_secret: "s3cr3t".to_string(),
                ..WebhookConfig::default()
            },
            dispatcher,
            status_store,
            task_store.clone(),
            Arc::new(NullAuditSink),
        );

        let body = issue_labeled_body("acme", "widgets", 1, 7, "forgework");
        let result = handler.handle("issues", Some("sha256=bad"), None, &body).await;

        assert!(matches!(result, Err(WebhookError::InvalidSignature(_))));
        assert!(tasks_is_empty(&task_store).await);
    }

    async fn tasks_is_empty(tasks: &Arc<dyn TaskStore>) -> bool {
        tasks.list_by_installation(7).await.unwrap().is_empty()
    }
}
