//! Task store (C7).
//!
//! Same in-memory/Postgres-stub seam as the job status store, grounded in
//! the teacher's `JobStore`/`InMemoryJobStore` pattern: an in-memory default
//! good enough to build and test against, with a feature-gated persistent
//! counterpart left unimplemented.

use std::collections::HashMap;

use forgework_core::TaskId;
use parking_lot::RwLock;
use thiserror::Error;

use crate::model::AgentTask;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskStoreError {
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("task already exists: {0}")]
    AlreadyExists(TaskId),
    #[error("storage error: {0}")]
    Storage(String),
}

#[async_trait::async_trait]
pub trait TaskStore: Send + Sync {
    async fn get(&self, id: &TaskId) -> Result<Option<AgentTask>, TaskStoreError>;

    /// Errors if `id` already exists.
    async fn create(&self, task: AgentTask) -> Result<(), TaskStoreError>;

    /// Upsert: updating a non-existent id creates it. An intentional
    /// affordance for the handler path, which may not know in advance
    /// whether a task already exists for an issue.
    async fn update(&self, task: AgentTask) -> Result<(), TaskStoreError>;

    async fn list_by_installation(&self, installation_id: u64) -> Result<Vec<AgentTask>, TaskStoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, AgentTask>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get(&self, id: &TaskId) -> Result<Option<AgentTask>, TaskStoreError> {
        Ok(self.tasks.read().get(id).cloned())
    }

    async fn create(&self, task: AgentTask) -> Result<(), TaskStoreError> {
        let mut tasks = self.tasks.write();
        if tasks.contains_key(&task.id) {
            return Err(TaskStoreError::AlreadyExists(task.id));
        }
        tasks.insert(task.id.clone(), task);
        Ok(())
    }

    async fn update(&self, task: AgentTask) -> Result<(), TaskStoreError> {
        self.tasks.write().insert(task.id.clone(), task);
        Ok(())
    }

    async fn list_by_installation(&self, installation_id: u64) -> Result<Vec<AgentTask>, TaskStoreError> {
        let mut result: Vec<_> = self
            .tasks
            .read()
            .values()
            .filter(|t| t.installation_id == installation_id)
            .cloned()
            .collect();
        result.sort_by_key(|t| t.created_at);
        Ok(result)
    }
}

#[cfg(feature = "postgres")]
pub struct PostgresTaskStore;

#[cfg(feature = "postgres")]
#[async_trait::async_trait]
impl TaskStore for PostgresTaskStore {
    async fn get(&self, _id: &TaskId) -> Result<Option<AgentTask>, TaskStoreError> {
        Err(TaskStoreError::Storage("not yet implemented".into()))
    }

    async fn create(&self, _task: AgentTask) -> Result<(), TaskStoreError> {
        Err(TaskStoreError::Storage("not yet implemented".into()))
    }

    async fn update(&self, _task: AgentTask) -> Result<(), TaskStoreError> {
        Err(TaskStoreError::Storage("not yet implemented".into()))
    }

    async fn list_by_installation(&self, _installation_id: u64) -> Result<Vec<AgentTask>, TaskStoreError> {
        Err(TaskStoreError::Storage("not yet implemented".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskStatus;

    fn task(owner: &str, repo: &str, issue: u64, installation_id: u64) -> AgentTask {
        AgentTask::new(TaskId::new(owner, repo, issue), installation_id, owner, repo, issue)
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = InMemoryTaskStore::new();
        let t = task("acme", "widgets", 1, 7);
        let id = t.id.clone();
        store.create(t).await.unwrap();
        let fetched = store.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched.status, TaskStatus::PendingPlanning);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_id() {
        let store = InMemoryTaskStore::new();
        let t = task("acme", "widgets", 1, 7);
        store.create(t.clone()).await.unwrap();
        assert!(matches!(
            store.create(t).await,
            Err(TaskStoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn update_on_unknown_id_creates_it() {
        let store = InMemoryTaskStore::new();
        let t = task("acme", "widgets", 2, 7);
        let id = t.id.clone();
        store.update(t).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_by_installation_filters_and_orders() {
        let store = InMemoryTaskStore::new();
        store.create(task("acme", "widgets", 1, 7)).await.unwrap();
        store.create(task("acme", "widgets", 2, 7)).await.unwrap();
        store.create(task("acme", "widgets", 3, 9)).await.unwrap();

        let for_seven = store.list_by_installation(7).await.unwrap();
        assert_eq!(for_seven.len(), 2);
    }
}
