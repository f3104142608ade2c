//! `/health/detailed` probes.
//!
//! Generalizes the teacher's plain `/health` 200-OK stub into a registered
//! set of checks, aggregated `Healthy` iff every probe reports `Healthy`.

use std::sync::Arc;

use forgework_jobs::{JobQueue, StatusStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProbeResult {
    pub name: String,
    pub status: HealthStatus,
    pub detail: Option<String>,
}

pub trait HealthProbe: Send + Sync {
    fn name(&self) -> &str;
    fn check(&self) -> ProbeResultFuture;
}

/// Probes are async (the status store check touches a lock that may, in a
/// persistent backend, touch I/O), but the trait needs to stay
/// object-safe, so `check` returns a boxed future rather than being an
/// `async fn` directly.
pub type ProbeResultFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = ProbeResult> + Send>>;

/// Checks the status store answers a trivial query.
pub struct StatusStoreProbe {
    store: Arc<dyn StatusStore>,
}

impl StatusStoreProbe {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self { store }
    }
}

impl HealthProbe for StatusStoreProbe {
    fn name(&self) -> &str {
        "status_store"
    }

    fn check(&self) -> ProbeResultFuture {
        let store = self.store.clone();
        Box::pin(async move {
            let (status, detail) = match store.metrics().await {
                Ok(_) => (HealthStatus::Healthy, None),
                Err(e) => (HealthStatus::Unhealthy, Some(e.to_string())),
            };
            ProbeResult {
                name: "status_store".to_string(),
                status,
                detail,
            }
        })
    }
}

/// Checks the job queue has not been closed (shutdown in progress).
pub struct QueueProbe {
    queue: Arc<JobQueue>,
}

impl QueueProbe {
    pub fn new(queue: Arc<JobQueue>) -> Self {
        Self { queue }
    }
}

impl HealthProbe for QueueProbe {
    fn name(&self) -> &str {
        "queue"
    }

    fn check(&self) -> ProbeResultFuture {
        let queue = self.queue.clone();
        Box::pin(async move {
            let status = if queue.is_closed() {
                HealthStatus::Unhealthy
            } else {
                HealthStatus::Healthy
            };
            ProbeResult {
                name: "queue".to_string(),
                status,
                detail: None,
            }
        })
    }
}

/// Runs every probe and aggregates: `Unhealthy` iff any probe reports
/// `Unhealthy`.
pub async fn run_all(probes: &[Arc<dyn HealthProbe>]) -> (HealthStatus, Vec<ProbeResult>) {
    let mut results = Vec::with_capacity(probes.len());
    for probe in probes {
        results.push(probe.check().await);
    }
    let overall = if results.iter().all(|r| r.status == HealthStatus::Healthy) {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    };
    (overall, results)
}
