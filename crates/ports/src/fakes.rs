//! In-memory fake implementations of every port, for tests.
//!
//! Grounded in the teacher's `test-support` feature convention
//! (`oj-adapters`'s `FakeAdapter` exports): a crate feature that exists only
//! to hand other crates' tests a deterministic, in-process stand-in for a
//! real external collaborator.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use forgework_core::Plan;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::audit::{AuditEvent, AuditSink};
use crate::container::{ContainerError, ContainerId, ContainerManager, ExecOutput};
use crate::forge_client::{ForgeClientError, SourceForgeClient};
use crate::planner::{PlanRequest, PlanningError, PlanningService};

/// Planning service whose responses are scripted ahead of time.
///
/// Each call to `create_plan` pops the next scripted response; calling it
/// more times than responses were scripted panics, since that indicates the
/// test under-specified the scenario rather than a real runtime condition.
pub struct FakePlanningService {
    responses: Mutex<VecDeque<Result<Plan, PlanningError>>>,
    requests: Mutex<Vec<PlanRequest>>,
}

impl FakePlanningService {
    pub fn new(responses: impl IntoIterator<Item = Result<Plan, PlanningError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always_succeeding(plan: Plan) -> Self {
        Self::new(std::iter::repeat_with(move || Ok(plan.clone())))
    }

    pub fn requests(&self) -> Vec<PlanRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl PlanningService for FakePlanningService {
    async fn create_plan(&self, request: PlanRequest) -> Result<Plan, PlanningError> {
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .expect("FakePlanningService called more times than responses were scripted")
    }
}

/// Container manager that accepts every operation and records the calls it
/// received, without touching the filesystem or a real runtime.
#[derive(Default)]
pub struct FakeContainerManager {
    files: Mutex<std::collections::HashMap<(String, String), Vec<u8>>>,
    pub commands: Mutex<Vec<(String, String, Vec<String>)>>,
}

impl FakeContainerManager {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContainerManager for FakeContainerManager {
    async fn create_container(
        &self,
        owner: &str,
        repo: &str,
        _token: &str,
        branch: &str,
        _cancel: &CancellationToken,
    ) -> Result<ContainerId, ContainerError> {
        Ok(ContainerId(format!("{owner}/{repo}@{branch}")))
    }

    async fn execute(
        &self,
        container: &ContainerId,
        command: &str,
        args: &[String],
        _cancel: &CancellationToken,
    ) -> Result<ExecOutput, ContainerError> {
        self.commands
            .lock()
            .push((container.0.clone(), command.to_string(), args.to_vec()));
        Ok(ExecOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    async fn read_file(
        &self,
        container: &ContainerId,
        path: &str,
        _cancel: &CancellationToken,
    ) -> Result<Vec<u8>, ContainerError> {
        self.files
            .lock()
            .get(&(container.0.clone(), path.to_string()))
            .cloned()
            .ok_or_else(|| ContainerError::Failed(format!("no such file: {path}")))
    }

    async fn write_file(
        &self,
        container: &ContainerId,
        path: &str,
        contents: &[u8],
        _cancel: &CancellationToken,
    ) -> Result<(), ContainerError> {
        self.files
            .lock()
            .insert((container.0.clone(), path.to_string()), contents.to_vec());
        Ok(())
    }

    async fn commit_and_push(
        &self,
        _container: &ContainerId,
        _message: &str,
        _branch: &str,
        _cancel: &CancellationToken,
    ) -> Result<(), ContainerError> {
        Ok(())
    }

    async fn cleanup(&self, _container: &ContainerId) -> Result<(), ContainerError> {
        Ok(())
    }
}

/// Source-forge client that mints sequential pull-request numbers in memory.
pub struct FakeSourceForgeClient {
    next_pr_number: Mutex<u64>,
    pub branches: Mutex<Vec<(String, String, String)>>,
    pub comments: Mutex<Vec<(String, String, u64, String)>>,
}

impl Default for FakeSourceForgeClient {
    fn default() -> Self {
        Self {
            next_pr_number: Mutex::new(1),
            branches: Mutex::new(Vec::new()),
            comments: Mutex::new(Vec::new()),
        }
    }
}

impl FakeSourceForgeClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SourceForgeClient for FakeSourceForgeClient {
    async fn create_working_branch(
        &self,
        owner: &str,
        repo: &str,
        _base: &str,
        branch: &str,
    ) -> Result<(), ForgeClientError> {
        self.branches
            .lock()
            .push((owner.to_string(), repo.to_string(), branch.to_string()));
        Ok(())
    }

    async fn create_draft_pull_request(
        &self,
        _owner: &str,
        _repo: &str,
        _branch: &str,
        _title: &str,
        _body: &str,
    ) -> Result<u64, ForgeClientError> {
        let mut next = self.next_pr_number.lock();
        let number = *next;
        *next += 1;
        Ok(number)
    }

    async fn update_pull_request_description(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
        _body: &str,
    ) -> Result<(), ForgeClientError> {
        Ok(())
    }

    async fn post_pull_request_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<(), ForgeClientError> {
        self.comments.lock().push((
            owner.to_string(),
            repo.to_string(),
            number,
            body.to_string(),
        ));
        Ok(())
    }

    async fn get_pull_request_number_for_branch(
        &self,
        _owner: &str,
        _repo: &str,
        _branch: &str,
    ) -> Result<Option<u64>, ForgeClientError> {
        Ok(None)
    }
}

/// Audit sink that keeps every event in memory, for assertions.
#[derive(Default)]
pub struct InMemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.label.clone()).collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

impl AuditSink for Arc<InMemoryAuditSink> {
    fn record(&self, event: AuditEvent) {
        (**self).record(event)
    }
}
