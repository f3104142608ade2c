//! Ports: the traits through which the core reaches every out-of-scope
//! collaborator (the LLM, the container runtime, the source-forge API, the
//! audit trail).
//!
//! None of these traits are implemented here except as test fakes. Real
//! implementations live in a binary crate wiring layer, out of scope for
//! this repository.

pub mod audit;
pub mod container;
pub mod forge_client;
pub mod planner;

#[cfg(feature = "test-support")]
pub mod fakes;

pub use audit::{AuditEvent, AuditSink, NullAuditSink};
pub use container::{ContainerError, ContainerId, ContainerManager, ExecOutput};
pub use forge_client::{ForgeClientError, SourceForgeClient};
pub use planner::{PlanRequest, PlanningError, PlanningService};
