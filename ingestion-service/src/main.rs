use std::net::SocketAddr;

use anyhow::Result;
use meter_ingestion_service::{
    api::{self, AppState},
    config::AppConfig,
    metrics_server, observability,
    stores::Store,
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    // The backend is chosen here, once, and shared by every handler.
    let store = Store::connect(&cfg.storage).await?;
    tracing::info!(backend = store.backend_name(), "meter store ready");

    let addr: SocketAddr = cfg
        .http
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid http.bind_addr: {e}"))?;

    let app = api::router(AppState::new(store), cfg.http.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "meter registry listening");

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
