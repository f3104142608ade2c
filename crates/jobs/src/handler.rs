//! The job handler seam: the registry the dispatcher checks for admission
//! and the processor invokes for execution.
//!
//! `async_trait`-based rather than a boxed `Fn` (the teacher's
//! `JobExecutor::register_handler` shape): handlers here close over `Arc`-
//! shared ports (`PlanningService`, `ContainerManager`, ...), and async
//! trait objects compose more cleanly than a closure capturing an async
//! block by value.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::types::{Job, JobOutcome};

#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The type tag this handler is registered under (e.g. `"plan"`).
    fn job_type(&self) -> &str;

    async fn execute(&self, job: &Job, cancel: &CancellationToken) -> JobOutcome;
}

/// Handlers indexed by their declared type tag. Shared between the
/// dispatcher (admission checks) and the processor (execution dispatch).
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("a handler is already registered for job type {0:?}")]
    Duplicate(String),
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn JobHandler>) -> Result<(), RegistrationError> {
        let job_type = handler.job_type().to_string();
        if self.handlers.contains_key(&job_type) {
            return Err(RegistrationError::Duplicate(job_type));
        }
        self.handlers.insert(job_type, handler);
        Ok(())
    }

    pub fn get(&self, job_type: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(job_type).cloned()
    }

    pub fn contains(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoHandler;

    #[async_trait]
    impl JobHandler for EchoHandler {
        fn job_type(&self) -> &str {
            "echo"
        }

        async fn execute(&self, _job: &Job, _cancel: &CancellationToken) -> JobOutcome {
            JobOutcome::Success
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(EchoHandler)).unwrap();
        let err = registry.register(Arc::new(EchoHandler)).unwrap_err();
        assert!(matches!(err, RegistrationError::Duplicate(t) if t == "echo"));
    }

    #[test]
    fn unregistered_type_is_absent() {
        let registry = HandlerRegistry::new();
        assert!(!registry.contains("echo"));
        assert!(registry.get("echo").is_none());
    }
}
