//! Agent task: the higher-level unit the webhook handler manages, driven
//! through planning and execution by jobs dispatched against it.

use chrono::{DateTime, Utc};
use forgework_core::{Plan, TaskId};
use serde::{Deserialize, Serialize};

/// `PendingPlanning → Planned → Executing → Completed`, with `Failed` and
/// `Cancelled` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    PendingPlanning,
    Planned,
    Executing,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            TaskStatus::Failed | TaskStatus::Cancelled => true,
            TaskStatus::Planned => *self == TaskStatus::PendingPlanning,
            TaskStatus::Executing => *self == TaskStatus::Planned,
            TaskStatus::Completed => *self == TaskStatus::Executing,
            TaskStatus::PendingPlanning => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTask {
    pub id: TaskId,
    pub installation_id: u64,
    pub repository_owner: String,
    pub repository_name: String,
    pub issue_number: u64,
    pub status: TaskStatus,
    pub plan: Option<Plan>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl AgentTask {
    pub fn new(
        id: TaskId,
        installation_id: u64,
        repository_owner: impl Into<String>,
        repository_name: impl Into<String>,
        issue_number: u64,
    ) -> Self {
        Self {
            id,
            installation_id,
            repository_owner: repository_owner.into(),
            repository_name: repository_name.into(),
            issue_number,
            status: TaskStatus::PendingPlanning,
            plan: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    /// Transitions to `next` if legal; returns whether it took effect.
    pub fn transition_to(&mut self, next: TaskStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        if next == TaskStatus::Executing && self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        self.status = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> AgentTask {
        AgentTask::new(TaskId::new("acme", "widgets", 1), 42, "acme", "widgets", 1)
    }

    #[test]
    fn happy_path_transitions_in_order() {
        let mut task = task();
        assert!(task.transition_to(TaskStatus::Planned));
        assert!(task.transition_to(TaskStatus::Executing));
        assert!(task.started_at.is_some());
        assert!(task.transition_to(TaskStatus::Completed));
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn cannot_skip_planned() {
        let mut task = task();
        assert!(!task.transition_to(TaskStatus::Executing));
        assert_eq!(task.status, TaskStatus::PendingPlanning);
    }

    #[test]
    fn failed_and_cancelled_reachable_from_any_non_terminal_state() {
        let mut task = task();
        assert!(task.transition_to(TaskStatus::Failed));
        assert!(task.status.is_terminal());

        let mut task2 = task();
        task2.transition_to(TaskStatus::Planned);
        assert!(task2.transition_to(TaskStatus::Cancelled));
    }

    #[test]
    fn terminal_states_have_no_outbound_transitions() {
        let mut task = task();
        task.transition_to(TaskStatus::Failed);
        assert!(!task.transition_to(TaskStatus::Planned));
        assert!(!task.transition_to(TaskStatus::Completed));
    }
}
