use axum::http::{header, Method};
use axum::Router;
use configs::{AppConfig, StoreBackend};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::routes::{self, AppState};
use service::{storage, StatusStore};

/// Any origin, the three methods the endpoint serves, `Content-Type` requests.
pub fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Wire the configured backend into a `StatusStore` and build the router.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    if cfg.store.backend == StoreBackend::File {
        common::env::ensure_parent_dir(&cfg.store.file_path).await?;
    }
    let kv = storage::build_kv_store(&cfg.store)?;
    let status = StatusStore::new(kv, cfg.store.status_key.clone());
    Ok(routes::build_router(AppState::new(status), build_cors()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!(event = "shutdown_signal", "received Ctrl+C, draining connections");
}

/// Public entry: build the app and run the HTTP server until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let app = build_app(&cfg).await?;

    let listener = TcpListener::bind((cfg.server.host.as_str(), cfg.server.port)).await?;
    let addr = listener.local_addr()?;
    info!(%addr, backend = ?cfg.store.backend, key = %cfg.store.status_key, "starting status server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
