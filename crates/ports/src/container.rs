//! The container manager port: isolated workspace lifecycle.
//!
//! Every operation accepts a `CancellationToken` so a handler can honor a
//! `Processor` cancellation mid-execution, per the processor's cooperative
//! cancellation contract.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Opaque handle to a running container workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ContainerId(pub String);

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of running a command inside a container.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("container operation cancelled")]
    Cancelled,
    #[error("container unavailable: {0}")]
    Unavailable(String),
    #[error("container operation failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait ContainerManager: Send + Sync {
    async fn create_container(
        &self,
        owner: &str,
        repo: &str,
        token: &str,
        branch: &str,
        cancel: &CancellationToken,
    ) -> Result<ContainerId, ContainerError>;

    async fn execute(
        &self,
        container: &ContainerId,
        command: &str,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<ExecOutput, ContainerError>;

    async fn read_file(
        &self,
        container: &ContainerId,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, ContainerError>;

    async fn write_file(
        &self,
        container: &ContainerId,
        path: &str,
        contents: &[u8],
        cancel: &CancellationToken,
    ) -> Result<(), ContainerError>;

    async fn commit_and_push(
        &self,
        container: &ContainerId,
        message: &str,
        branch: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ContainerError>;

    async fn cleanup(&self, container: &ContainerId) -> Result<(), ContainerError>;
}
