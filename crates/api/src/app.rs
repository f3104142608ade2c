//! Process wiring: constructs every C1-C9 component and assembles the
//! Axum router, grounded directly in the teacher's
//! `forgeerp-api::app::build_app` shape (`Extension`/`with_state`-injected
//! `Arc<AppState>`, a `tower::ServiceBuilder` layer stack).

use std::sync::Arc;

use axum::Router;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use forgework_jobs::{
    Dispatcher, HandlerRegistry, InMemoryStatusStore, JobQueue, Processor, ProcessorConfig, StatusStore,
};
use forgework_ports::{AuditSink, ContainerManager, PlanningService, SourceForgeClient};
use forgework_tasks::{InMemoryTaskStore, TaskStore};
use forgework_webhook::WebhookHandler;

use crate::config::AppConfig;
use crate::handlers::{ExecuteJobHandler, PlanJobHandler};
use crate::state::AppState;

/// Every out-of-scope collaborator the handlers need, bundled for a single
/// `build_app` call so `main` doesn't have to pass five `Arc`s by hand.
pub struct Collaborators {
    pub planner: Arc<dyn PlanningService>,
    pub container: Arc<dyn ContainerManager>,
    pub forge_client: Arc<dyn SourceForgeClient>,
    pub audit: Arc<dyn AuditSink>,
}

/// The built application: the router to serve, the spawned processor
/// worker handles, and the root cancellation token `main` trips on
/// shutdown.
pub struct BuiltApp {
    pub router: Router,
    pub worker_handles: Vec<tokio::task::JoinHandle<()>>,
    pub root_cancel: CancellationToken,
    pub queue: Arc<JobQueue>,
}

pub fn build_app(config: AppConfig, collaborators: Collaborators) -> BuiltApp {
    let status_store: Arc<dyn StatusStore> = Arc::new(InMemoryStatusStore::new());
    let task_store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
    let queue = Arc::new(JobQueue::new(config.max_queue_size));
    let dedup = Arc::new(forgework_jobs::DeduplicationService::new());

    // Created up front and shared with `Dispatcher` (so every token it
    // binds for a `Queued` job is a child of the real process root) and
    // with `Processor::run` below (so workers stop taking on shutdown).
    let root_cancel = CancellationToken::new();

    // The registry starts empty: `Dispatcher` only holds a shared
    // reference to it, so the plan handler can be built against a
    // dispatcher that targets this same (not-yet-populated) registry and
    // still see the execute handler once it's registered below.
    let handlers = Arc::new(Mutex::new(HandlerRegistry::new()));

    let dispatcher = Arc::new(Dispatcher::new(
        queue.clone(),
        status_store.clone(),
        dedup.clone(),
        handlers.clone(),
        root_cancel.clone(),
    ));

    handlers
        .lock()
        .register(Arc::new(PlanJobHandler::new(
            collaborators.planner,
            task_store.clone(),
            dispatcher.clone(),
            collaborators.audit.clone(),
        )))
        .expect("plan handler registered once");
    handlers
        .lock()
        .register(Arc::new(ExecuteJobHandler::new(
            collaborators.container,
            collaborators.forge_client,
            task_store.clone(),
            collaborators.audit.clone(),
        )))
        .expect("execute handler registered once");

    let processor_config = ProcessorConfig {
        max_concurrency: config.max_concurrency,
        retry_policy: config.retry_policy.clone(),
    };
    let processor = Arc::new(Processor::new(
        queue.clone(),
        status_store.clone(),
        dedup,
        handlers,
        dispatcher.clone(),
        task_store.clone(),
        processor_config,
    ));

    let worker_handles = processor.run(root_cancel.clone());

    let webhook = Arc::new(WebhookHandler::new(
        config.webhook.clone(),
        dispatcher.clone(),
        status_store.clone(),
        task_store.clone(),
        collaborators.audit,
    ));

    let state = Arc::new(AppState::new(
        dispatcher,
        status_store,
        task_store,
        queue.clone(),
        webhook,
        config,
    ));

    let router = crate::routes::router(state).layer(TraceLayer::new_for_http());

    BuiltApp {
        router,
        worker_handles,
        root_cancel,
        queue,
    }
}
