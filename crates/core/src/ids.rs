//! Strongly-typed identifiers used across the job subsystem and task store.

use core::str::FromStr;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a background job.
///
/// Uses UUIDv7 (time-ordered) so that sorting by id approximates sorting by
/// creation time without consulting the timestamp column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for JobId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s)
            .map(Self)
            .map_err(|e| DomainError::invalid_id(format!("JobId: {e}")))
    }
}

/// Identifier of an agent task, in the canonical form
/// `<owner>/<repo>/issues/<number>`.
///
/// This is a validated newtype rather than a bare `String`: constructing one
/// from an arbitrary string checks the shape up front so every later reader
/// (task store, webhook handler, HTTP routes) can trust it without
/// re-parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Build a task id from its constituent parts.
    pub fn new(owner: impl AsRef<str>, repo: impl AsRef<str>, issue_number: u64) -> Self {
        Self(format!(
            "{}/{}/issues/{}",
            owner.as_ref(),
            repo.as_ref(),
            issue_number
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split back into `(owner, repo, issue_number)`.
    pub fn parts(&self) -> Option<(&str, &str, u64)> {
        let mut segments = self.0.splitn(4, '/');
        let owner = segments.next()?;
        let repo = segments.next()?;
        if segments.next()? != "issues" {
            return None;
        }
        let number: u64 = segments.next()?.parse().ok()?;
        Some((owner, repo, number))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TaskId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let candidate = Self(s.to_string());
        if candidate.parts().is_none() {
            return Err(DomainError::invalid_id(format!(
                "TaskId must be <owner>/<repo>/issues/<number>, got {s:?}"
            )));
        }
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_round_trips_through_parts() {
        let id = TaskId::new("acme", "widgets", 42);
        assert_eq!(id.as_str(), "acme/widgets/issues/42");
        assert_eq!(id.parts(), Some(("acme", "widgets", 42)));
    }

    #[test]
    fn task_id_rejects_malformed_strings() {
        assert!("acme/widgets/42".parse::<TaskId>().is_err());
        assert!("acme/widgets/issues/not-a-number".parse::<TaskId>().is_err());
        assert!("acme/widgets/pulls/42".parse::<TaskId>().is_err());
    }

    #[test]
    fn job_id_is_time_ordered() {
        let a = JobId::new();
        let b = JobId::new();
        assert_ne!(a, b);
    }
}
