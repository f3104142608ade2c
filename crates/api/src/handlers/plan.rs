//! The `"plan"` job handler: calls the LLM planning port, stores the
//! resulting plan, and dispatches the follow-up `"execute"` job.
//!
//! **Design decision (not specified).** The spec's webhook handler only
//! describes dispatching a planning job on a labeled issue; it doesn't say
//! who dispatches the execution job that drives the plan to completion.
//! This handler does, immediately after a successful plan, with
//! idempotency key `execute:<taskId>` — the same "handler publishes the
//! next job" shape the spec already uses for the webhook-to-planning
//! transition. See DESIGN.md.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use forgework_core::TaskId;
use forgework_jobs::{Dispatcher, Job, JobHandler, JobOutcome};
use forgework_ports::{AuditEvent, AuditSink, PlanRequest, PlanningError, PlanningService};
use forgework_tasks::{TaskStatus, TaskStore};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanPayload {
    task_id: String,
    installation_id: u64,
    issue_title: String,
    #[serde(default)]
    issue_body: Option<String>,
}

pub struct PlanJobHandler {
    planner: Arc<dyn PlanningService>,
    task_store: Arc<dyn TaskStore>,
    dispatcher: Arc<Dispatcher>,
    audit: Arc<dyn AuditSink>,
}

impl PlanJobHandler {
    pub fn new(
        planner: Arc<dyn PlanningService>,
        task_store: Arc<dyn TaskStore>,
        dispatcher: Arc<Dispatcher>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            planner,
            task_store,
            dispatcher,
            audit,
        }
    }

    async fn fail_task(&self, task_id: &TaskId, error: &str) {
        if let Ok(Some(mut task)) = self.task_store.get(task_id).await {
            task.error = Some(error.to_string());
            task.transition_to(TaskStatus::Failed);
            let _ = self.task_store.update(task).await;
        }
    }
}

#[async_trait]
impl JobHandler for PlanJobHandler {
    fn job_type(&self) -> &str {
        "plan"
    }

    async fn execute(&self, job: &Job, cancel: &CancellationToken) -> JobOutcome {
        let payload: PlanPayload = match serde_json::from_value(job.payload.clone()) {
            Ok(p) => p,
            Err(e) => return JobOutcome::failure(format!("malformed plan payload: {e}"), false),
        };

        let task_id: TaskId = match payload.task_id.parse() {
            Ok(id) => id,
            Err(e) => return JobOutcome::failure(format!("invalid task id: {e}"), false),
        };

        let request = PlanRequest {
            issue_title: payload.issue_title,
            issue_body: payload.issue_body.unwrap_or_default(),
            repository_summary: None,
            instructions_markdown: None,
        };

        let plan = tokio::select! {
            result = self.planner.create_plan(request) => result,
            _ = cancel.cancelled() => return JobOutcome::failure("cancelled", false),
        };

        let plan = match plan {
            Ok(plan) => plan,
            Err(err @ PlanningError::Transient(_)) => {
                return JobOutcome::failure(err.to_string(), true);
            }
            Err(err @ PlanningError::Permanent(_)) => {
                self.fail_task(&task_id, &err.to_string()).await;
                return JobOutcome::failure(err.to_string(), false);
            }
        };

        let Ok(Some(mut task)) = self.task_store.get(&task_id).await else {
            return JobOutcome::failure(format!("unknown task {task_id}"), false);
        };
        task.plan = Some(plan);
        task.transition_to(TaskStatus::Planned);
        if self.task_store.update(task).await.is_err() {
            return JobOutcome::failure("failed to persist plan", true);
        }

        self.audit.record(AuditEvent::new("plan.generated", job.id.to_string()));

        let execute_job = Job::new(
            "execute",
            serde_json::json!({ "taskId": task_id.to_string(), "installationId": payload.installation_id }),
        )
        .with_idempotency_key(format!("execute:{task_id}"))
        .with_source("plan_handler")
        .with_metadata("task_id", task_id.to_string())
        .with_metadata("installation_id", payload.installation_id.to_string());

        let _ = self.dispatcher.dispatch(execute_job).await;

        JobOutcome::Success
    }
}
