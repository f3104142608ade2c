//! Concrete `JobHandler` implementations registered with the dispatcher.
//!
//! The planning and execution *work itself* is an out-of-scope
//! collaborator per the spec (the LLM planner, the container manager, the
//! source-forge client) — these handlers are the thin glue the processor
//! invokes, which in turn call through the ports. No refactoring,
//! package-manager detection, or dependency-graph analysis lives here;
//! that's explicitly non-goal territory the real collaborators would own.

pub mod execute;
pub mod plan;

pub use execute::ExecuteJobHandler;
pub use plan::PlanJobHandler;
