//! Webhook payload shapes, limited to the fields the handler relies on.
//!
//! Grounded in the `issues`/`installation` event shapes from the original
//! spec's §6 — deliberately narrow structs rather than a full source-forge
//! API client's wire model, since the handler reads a handful of fields and
//! nothing else.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: RepositoryOwner,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InstallationRef {
    pub id: u64,
}

/// The `issues` event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct IssuesEvent {
    pub action: String,
    #[serde(default)]
    pub label: Option<Label>,
    pub issue: Issue,
    pub repository: Repository,
    pub installation: InstallationRef,
}

/// The `installation` event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationEvent {
    pub action: String,
    pub installation: InstallationRef,
}
