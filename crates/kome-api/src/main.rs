//! kome-api server binary.
//!
//! Reads configuration from the environment (see [`AppConfig::from_env`]),
//! builds application state, starts the escalation sweeper and serves HTTP
//! until Ctrl-C.

use std::net::SocketAddr;

use anyhow::Context;
use kome_api::bootstrap::build_state;
use kome_api::state::{AppConfig, LogFormat};
use kome_api::sweeper;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    init_tracing(config.log_format);
    tracing::info!(?config, "starting kome-api");

    let state = build_state(&config)
        .await
        .context("failed to initialize application state")?;
    let sweeper = sweeper::spawn(state.disputes.clone(), config.sweep_interval);
    let app = kome_api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("kome-api listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sweeper.shutdown().await;
    tracing::info!("kome-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
