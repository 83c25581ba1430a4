//! procprom exporter
//!
//! Loads `procprom.yaml` (or the path given as first argument), publishes the
//! process gauges and serves them on `/metrics` until Ctrl-C.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{fmt, EnvFilter};

use procprom_core::error::{PromError, Result};
use procprom_exporter::{app_state, config, router, ProcessEmitter};

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "procprom.yaml".to_string());
    let cfg = config::load_from_file(&path)?;
    let listen = cfg.server.listen_addr()?;

    let emitter = Arc::new(ProcessEmitter::new(config::build_options(&cfg)?)?);

    let mut produced = emitter.subscribe();
    tokio::spawn(async move {
        loop {
            match produced.recv().await {
                Ok(report) => tracing::debug!(reports = report.len(), "metrics produced"),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let app = router::build_router(app_state::AppState::new(Arc::clone(&emitter)));

    tracing::info!(%listen, config = %path, "procprom-exporter starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| PromError::Internal(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| PromError::Internal(format!("server failed: {e}")))?;

    emitter.destroy();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "ctrl-c handler failed; serving until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
