//! # Application Bootstrap
//!
//! Wires [`AppConfig`] into a ready [`AppState`]: storage backend, order
//! directory, event sinks, and the Prometheus recorder.

use std::sync::Arc;

use kome_dispute::{
    DisputeRepository, DisputeService, FanoutNotifier, InMemoryDisputeRepository,
    InMemoryOrderDirectory, OrderDirectory, TracingNotifier,
};
use kome_market_client::{MarketApiError, MarketClient};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use thiserror::Error;

use crate::db::{self, PgDisputeRepository};
use crate::middleware::metrics::MetricsNotifier;
use crate::state::{AppConfig, AppState, StorageBackend};

/// Startup failures. All are fatal.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("KOME_STORAGE=postgres requires DATABASE_URL")]
    MissingDatabaseUrl,
    #[error("database initialization failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("marketplace client initialization failed: {0}")]
    Market(#[from] MarketApiError),
    #[error("failed to install Prometheus recorder: {0}")]
    Metrics(#[from] BuildError),
}

/// Build application state from configuration.
///
/// Installs the global metrics recorder when metrics are enabled, so call
/// this once per process.
pub async fn build_state(config: &AppConfig) -> Result<AppState, BootstrapError> {
    let mut pool = None;
    let repo: Arc<dyn DisputeRepository> = match config.storage {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or(BootstrapError::MissingDatabaseUrl)?;
            let p = db::init_pool(url).await?;
            pool = Some(p.clone());
            Arc::new(PgDisputeRepository::new(p))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory dispute storage. State will not survive restarts.");
            Arc::new(InMemoryDisputeRepository::new())
        }
    };

    let directory: Arc<dyn OrderDirectory> = match &config.market {
        Some(market) => {
            tracing::info!(base_url = %market.base_url, "Using marketplace API for order lookups");
            Arc::new(MarketClient::new(market.clone())?)
        }
        None => {
            tracing::warn!(
                "MARKET_API_URL not set. Order directory is empty and every filing will fail with 404."
            );
            Arc::new(InMemoryOrderDirectory::new())
        }
    };

    let mut notifier = FanoutNotifier::new().with(Arc::new(TracingNotifier));
    let mut metrics = None;
    if config.metrics_enabled {
        metrics = Some(PrometheusBuilder::new().install_recorder()?);
        notifier = notifier.with(Arc::new(MetricsNotifier));
    }

    let service = DisputeService::new(repo, directory, config.dispute.clone())
        .with_notifier(Arc::new(notifier));

    let mut state = AppState::new(service);
    if let Some(pool) = pool {
        state = state.with_db_pool(pool);
    }
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kome_dispute::DisputeFilter;

    #[tokio::test]
    async fn memory_config_builds_empty_state() {
        let config = AppConfig {
            metrics_enabled: false,
            ..AppConfig::default()
        };
        let state = build_state(&config).await.unwrap();
        assert!(state.db_pool.is_none());
        assert!(state.metrics.is_none());
        assert!(state
            .disputes
            .list(&DisputeFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn postgres_without_url_fails() {
        let config = AppConfig {
            storage: StorageBackend::Postgres,
            metrics_enabled: false,
            ..AppConfig::default()
        };
        assert!(matches!(
            build_state(&config).await,
            Err(BootstrapError::MissingDatabaseUrl)
        ));
    }
}
