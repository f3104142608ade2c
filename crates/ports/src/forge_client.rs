//! The source-forge API client port: pull-request lifecycle operations.
//!
//! JWT/installation-token minting and the raw HTTP client live behind this
//! trait's real implementation, out of scope for the core.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForgeClientError {
    #[error("source-forge API request failed: {0}")]
    RequestFailed(String),
    #[error("source-forge API rejected the request: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait SourceForgeClient: Send + Sync {
    async fn create_working_branch(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        branch: &str,
    ) -> Result<(), ForgeClientError>;

    async fn create_draft_pull_request(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        title: &str,
        body: &str,
    ) -> Result<u64, ForgeClientError>;

    async fn update_pull_request_description(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<(), ForgeClientError>;

    async fn post_pull_request_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<(), ForgeClientError>;

    async fn get_pull_request_number_for_branch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Option<u64>, ForgeClientError>;
}
