//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use domain::{Directory, InMemoryDirectory, TracingNotifier};
use metrics_exporter_prometheus::PrometheusHandle;
use table_store::{InMemoryTableStore, PostgresTableStore, TableStore, TimeoutTableStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn load_directory(config: &Config) -> Option<Arc<dyn Directory>> {
    let Some(path) = &config.directory_path else {
        tracing::warn!("DIRECTORY_PATH not set, queries asking to populate will be rejected");
        return None;
    };
    let json = tokio::fs::read_to_string(path)
        .await
        .expect("failed to read directory file");
    let directory = InMemoryDirectory::from_json(&json).expect("invalid directory file");
    tracing::info!(path = %path.display(), "directory loaded");
    Some(Arc::new(directory))
}

async fn serve<S: TableStore + Clone + 'static>(
    store: S,
    config: &Config,
    metrics_handle: PrometheusHandle,
) {
    let directory = load_directory(config).await;
    let state = api::create_state(store, Arc::new(TracingNotifier), directory, config);
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");
    api::routes::metrics::describe();

    // 3. Pick the table store; every call is bounded by the persistence timeout
    match &config.database_url {
        Some(url) => {
            tracing::info!("using PostgreSQL table store");
            let store = PostgresTableStore::connect(url, 10)
                .await
                .expect("failed to connect to database");
            let store = TimeoutTableStore::new(store, config.persistence_timeout);
            serve(store, &config, metrics_handle).await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory table store");
            let store = TimeoutTableStore::new(InMemoryTableStore::new(), config.persistence_timeout);
            serve(store, &config, metrics_handle).await;
        }
    }

    tracing::info!("server shut down gracefully");
}
