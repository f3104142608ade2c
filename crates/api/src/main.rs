use std::sync::Arc;

use forgework_core::Plan;
use forgework_ports::fakes::{FakeContainerManager, FakePlanningService, FakeSourceForgeClient, InMemoryAuditSink};

#[tokio::main]
async fn main() {
    forgework_observability::init();

    let config = forgework_api::config::AppConfig::from_env();

    // No real LLM planner, container runtime, or source-forge client ships
    // in this repository (spec §1: "out of scope, treated only as
    // interfaces the core calls through"). Wiring the in-memory fakes here
    // keeps the binary runnable end-to-end; a real deployment replaces
    // `Collaborators` with adapters that implement the same ports.
    tracing::warn!(
        "no real planner/container/source-forge adapters configured; running with in-memory placeholders"
    );
    let collaborators = forgework_api::app::Collaborators {
        planner: Arc::new(FakePlanningService::always_succeeding(Plan::new(
            "placeholder plan: configure a real PlanningService adapter",
        ))),
        container: Arc::new(FakeContainerManager::new()),
        forge_client: Arc::new(FakeSourceForgeClient::new()),
        audit: Arc::new(InMemoryAuditSink::new()),
    };

    let built = forgework_api::app::build_app(config.clone(), collaborators);

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = %config.bind_addr, "failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!("listening on {}", listener.local_addr().unwrap());

    let root_cancel = built.root_cancel.clone();
    let queue = built.queue.clone();
    axum::serve(listener, built.router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            root_cancel.cancel();
            queue.close();
        })
        .await
        .unwrap();

    for handle in built.worker_handles {
        let _ = handle.await;
    }
}
