//! Shared application state, `Extension`-injected into every route.
//!
//! Grounded in the teacher's `Arc<AppState>`-via-`Extension` shape
//! (`forgeerp-api::app::build_app` wired `services::build_services()` the
//! same way): one `Arc` bundling every collaborator a route might need,
//! cloned cheaply per request rather than threaded through each handler
//! signature by hand.

use std::sync::Arc;

use forgework_jobs::{Dispatcher, JobQueue, StatusStore};
use forgework_tasks::TaskStore;

use crate::config::AppConfig;
use crate::health::HealthProbe;

pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub status_store: Arc<dyn StatusStore>,
    pub task_store: Arc<dyn TaskStore>,
    pub webhook: Arc<forgework_webhook::WebhookHandler>,
    pub health_probes: Vec<Arc<dyn HealthProbe>>,
    pub config: AppConfig,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        status_store: Arc<dyn StatusStore>,
        task_store: Arc<dyn TaskStore>,
        queue: Arc<JobQueue>,
        webhook: Arc<forgework_webhook::WebhookHandler>,
        config: AppConfig,
    ) -> Self {
        let health_probes: Vec<Arc<dyn HealthProbe>> = vec![
            Arc::new(crate::health::StatusStoreProbe::new(status_store.clone())),
            Arc::new(crate::health::QueueProbe::new(queue)),
        ];
        Self {
            dispatcher,
            status_store,
            task_store,
            webhook,
            health_probes,
            config,
        }
    }
}
