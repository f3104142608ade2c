//! Shared primitives: identifiers, the domain error taxonomy, time helpers.

pub mod error;
pub mod ids;
pub mod plan;
pub mod time;

pub use error::{DomainError, DomainResult};
pub use ids::{JobId, TaskId};
pub use plan::{Plan, PlanStep};
