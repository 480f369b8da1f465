//! feedstore-server: read API over the ingested collection.

use std::sync::Arc;

use tracing::info;

use feedstore_server::{build_router, AppState};
use feedstore_storage::{DocumentStore, ObjectDocumentStore, SnapshotCache};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    feedstore_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = feedstore_core::Config::from_env();
    config.log_summary();

    let store: Arc<dyn DocumentStore> = Arc::new(ObjectDocumentStore::from_config(&config)?);
    let cache = SnapshotCache::with_max_age(store, config.cache.max_age());
    let state = Arc::new(AppState::new(cache, config.redacted_summary()));

    let app = build_router(state, &config.server.cors_origin);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("feedstore-server stopped");
    Ok(())
}

/// Wait for SIGINT or SIGTERM (Unix) or Ctrl+C (cross-platform fallback).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT");
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM");
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl_c");
    }
    info!("shutdown signal received");
}
