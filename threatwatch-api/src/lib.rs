// ---------------------------------------------------------------------------
// REST API server
// ---------------------------------------------------------------------------
//
// Exposes the tenant, target, scan, and finding surfaces over HTTP, and runs
// the background scheduler for recurring scans.

pub mod auth;
pub mod error;
mod routes;
pub mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use threatwatch_engine::{run_scheduled_scans, ScanRunner};

use state::AppState;

/// Configuration for the API server.
pub struct ApiConfig {
    pub listen_addr: SocketAddr,
    pub db_path: Option<PathBuf>,
    pub api_key: Option<String>,
    pub scheduler_interval: Duration,
}

/// Build the axum Router (useful for testing).
pub fn build_router(state: Arc<AppState>) -> axum::Router {
    routes::build_router(state)
}

/// Start the API server and block until shutdown (Ctrl+C).
pub async fn start_server(config: ApiConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(config.db_path.as_deref(), config.api_key)?);

    // Seed bundled CVEs so vulnerability matching works out of the box.
    {
        let store = state.store.lock().await;
        if let Err(e) = threatwatch_db::seed_bundled_cves(&store) {
            warn!(error = %e, "failed to seed bundled CVE data");
        }
    }

    spawn_scheduler(state.runner.clone(), config.scheduler_interval);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server shut down");
    Ok(())
}

/// Periodic background task that runs due scheduled scans.
fn spawn_scheduler(runner: Arc<ScanRunner>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = run_scheduled_scans(&runner).await {
                warn!(error = %e, "scheduler pass failed");
            }
        }
    });
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    info!("shutdown signal received");
}
