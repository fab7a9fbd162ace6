//! CredMesh node server.
//!
//! Exposes one node's mesh endpoints: record push/pull, status,
//! tenant-wide summary and topology rollups, and a health endpoint
//! with a drain period on shutdown.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing::info;

mod config;
mod handlers;
mod logging;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = Config::from_env();
    let state = Arc::new(AppState::new(config.clone()));

    let app = router(state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(
        node_id = %config.node_id,
        tenant_id = %config.tenant_id,
        "credmesh node listening on {bind_addr}"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_with_drain(state))
        .await?;
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/mesh/:tenant_id/:node_id/push", post(handlers::mesh_push))
        .route("/mesh/:tenant_id/:node_id/pull", get(handlers::mesh_pull))
        .route(
            "/mesh/:tenant_id/:node_id/status",
            get(handlers::mesh_node_status),
        )
        .route("/mesh/:tenant_id/summary", get(handlers::mesh_summary))
        .route("/mesh/:tenant_id/topology", get(handlers::mesh_topology))
        .with_state(state)
}

/// Mark the node draining on SIGINT, then give in-flight peers a grace
/// period before the listener stops.
async fn shutdown_with_drain(state: Arc<AppState>) {
    let _ = tokio::signal::ctrl_c().await;
    state.draining.store(true, Ordering::SeqCst);
    let drain = Duration::from_secs(state.config.drain_secs);
    info!(drain_secs = state.config.drain_secs, "entering drain period");
    tokio::time::sleep(drain).await;
}
