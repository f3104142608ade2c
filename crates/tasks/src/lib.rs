//! Agent task lifecycle: the unit the webhook handler manages across
//! planning and execution.

pub mod model;
pub mod store;

pub use model::{AgentTask, TaskStatus};
pub use store::{InMemoryTaskStore, TaskStore, TaskStoreError};

#[cfg(feature = "postgres")]
pub use store::PostgresTaskStore;
