//! HTTP API server with observability for the dining service tracker.
//!
//! Provides REST endpoints for tables and their orders under `/api/v1`,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use domain::{Directory, LifecycleManager, Notifier, QueryEngine};
use metrics_exporter_prometheus::PrometheusHandle;
use table_store::TableStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use error::ApiError;
use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: TableStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let api = Router::new()
        .route("/tables", post(routes::tables::create::<S>))
        .route("/tables/orders", get(routes::orders::list_all::<S>))
        .route("/tables/{table_number}", get(routes::tables::get::<S>))
        .route(
            "/tables/{table_number}/orders",
            get(routes::orders::list_for_table::<S>).post(routes::orders::append::<S>),
        )
        .route(
            "/tables/{table_number}/orders/{order_id}",
            patch(routes::orders::patch::<S>).delete(routes::orders::remove::<S>),
        )
        .with_state(state);

    Router::new()
        .route("/health", get(routes::health::check))
        .nest("/api/v1", api)
        .merge(metrics_router)
        .fallback(not_found)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Invalid endpoint".to_string())
}

/// Creates the application state over the given store.
pub fn create_state<S: TableStore + Clone + 'static>(
    store: S,
    notifier: Arc<dyn Notifier>,
    directory: Option<Arc<dyn Directory>>,
    config: &Config,
) -> Arc<AppState<S>> {
    let lifecycle = LifecycleManager::new(store.clone(), notifier)
        .with_notify_timeout(config.notify_timeout)
        .with_max_attempts(config.max_write_retries)
        .with_retry_backoff(config.retry_backoff);

    let mut queries = QueryEngine::new(store);
    if let Some(directory) = directory {
        queries = queries.with_directory(directory);
    }

    Arc::new(AppState { lifecycle, queries })
}
