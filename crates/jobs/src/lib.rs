//! Background job subsystem: retry policy, deduplication, status store,
//! queue, dispatcher, and processor (C1-C6).

pub mod dedup;
pub mod dispatcher;
pub mod handler;
pub mod processor;
pub mod queue;
pub mod retry;
pub mod status_store;
pub mod types;

pub use dedup::DeduplicationService;
pub use dispatcher::{DispatchError, Dispatcher};
pub use handler::{HandlerRegistry, JobHandler, RegistrationError};
pub use processor::{Processor, ProcessorConfig};
pub use queue::JobQueue;
pub use retry::{next_delay, should_retry, FixedJitterSource, JitterSource, RandJitterSource};
pub use status_store::{InMemoryStatusStore, JobQuery, StatusMetrics, StatusStore, StatusStoreError, TypeMetrics};
pub use types::{BackoffStrategy, Job, JobAttemptRecord, JobOutcome, JobStatus, RetryPolicy};

#[cfg(feature = "postgres")]
pub use status_store::PostgresStatusStore;
