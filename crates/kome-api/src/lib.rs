//! # kome-api: Dispute Service HTTP API
//!
//! Axum service for the Kome rice marketplace's dispute resolution.
//!
//! ## Routes
//!
//! - `/v1/disputes/*`: filing, chat, statements, accept, escalate, votes
//! - `/v1/orders/{order_id}/dispute`: dispute lookup by order
//! - `/v1/admin/escalation-sweep`: on-demand timed escalation
//! - `/openapi.json`: generated OpenAPI 3.1 document
//! - `/health/*`: liveness and readiness probes
//! - `/metrics`: Prometheus exposition (when enabled)
//!
//! ## Middleware Stack (Tower)
//!
//! TraceLayer → MetricsMiddleware → Handler
//!
//! Handlers carry no business rules. Everything goes through
//! [`kome_dispute::DisputeService`], and every error is mapped to a
//! structured response by [`AppError`].

pub mod bootstrap;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod sweeper;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let mut api = Router::new()
        .merge(routes::disputes::router())
        .merge(routes::admin::router())
        .merge(openapi::router());

    // Only register the metrics middleware when a recorder is installed.
    if state.metrics.is_some() {
        api = api.route_layer(from_fn(middleware::metrics::metrics_middleware));
    }

    let probes = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(prometheus_metrics));

    Router::new()
        .merge(probes)
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe: the process is up.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: returns 200 "ready", or 503 when the database is
/// configured but unreachable.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }
    (StatusCode::OK, "ready").into_response()
}

/// Prometheus text exposition.
async fn prometheus_metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("metrics are disabled".into()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
