//! reqmeter exporter
//!
//! - Loads `reqmeter.yaml` (or the path given as the first argument)
//! - Serves `/healthz`, `/readyz`, `/metrics`
//! - Records response time per (peer, route, method, status)
//! - Ctrl-C flips readiness to draining, then shuts down gracefully

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use reqmeter_core::error::{ReqMeterError, Result};
use reqmeter_exporter::{app_state::AppState, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(code = e.code().as_str(), error = %e, "reqmeter-exporter failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "reqmeter.yaml".to_string());
    let cfg = config::load_from_file(&path)?;
    let listen = cfg.exporter.listen_addr()?;

    let state = AppState::new(cfg);
    let app = router::build_router(state.clone());

    tracing::info!(%listen, config = %path, "reqmeter-exporter starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| ReqMeterError::Internal(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| ReqMeterError::Internal(format!("server failed: {e}")))?;

    tracing::info!("reqmeter-exporter stopped");
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable; running until killed");
        std::future::pending::<()>().await;
    }
    state.set_draining();
    tracing::info!("shutdown signal received, draining");
}
