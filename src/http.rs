//! Operator HTTP endpoints: `/health` and the Prometheus `/metrics` scrape.

use crate::commands::core::Registry;
use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Health {
    pub status: &'static str,
    pub commands: usize,
    /// Handler starts since boot, summed over every command.
    pub served: u64,
}

async fn health(State(registry): State<Arc<Registry>>) -> Json<Health> {
    let served = registry.get_command_stats().iter().map(|(_, uses)| uses).sum();
    Json(Health {
        status: "ok",
        commands: registry.len(),
        served,
    })
}

async fn metrics() -> String {
    crate::metrics::gather_metrics()
}

pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(registry)
}

/// Serve [`router`] on `0.0.0.0:port` until the process exits.
pub async fn run_http_server(port: u16, registry: Arc<Registry>) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind HTTP server");
            return;
        }
    };
    tracing::info!(%addr, "HTTP server listening");

    if let Err(e) = axum::serve(listener, router(registry)).await {
        tracing::error!(error = %e, "HTTP server error");
    }
}
