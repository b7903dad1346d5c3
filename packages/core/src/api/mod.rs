//! Read-only dashboard API.
//!
//! Serves the reports and history persisted by the weekly run, plus the
//! health and Prometheus endpoints.

pub mod headers;
pub mod health;
pub mod reports;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::metrics::RunMetrics;
use crate::repository::HistoryRepository;

/// Assemble the full dashboard router.
pub fn create_router(repository: HistoryRepository, metrics: Arc<RunMetrics>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let reports_router = Router::new()
        .route("/reports/latest", get(reports::latest_report))
        .route("/history", get(reports::history))
        .route("/communities", get(reports::communities))
        .with_state(repository);

    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .with_state(metrics)
        .merge(reports_router)
        .layer(cors)
}

/// Serve `router` on `addr` until Ctrl+C.
pub async fn serve(router: Router, addr: std::net::SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Dashboard API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", err);
            }
            tracing::info!("Shutdown signal received. Stopping API.");
        })
        .await
}
