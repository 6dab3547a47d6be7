// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

//! Prometheus endpoint for the counters registered in the default registry.

use anyhow::Result;
use axum::{http::StatusCode, routing::get, Router};
use log::{error, info};
use prometheus::{Encoder, TextEncoder};
use tokio::net::TcpListener;

async fn metrics_handler() -> Result<String, (StatusCode, String)> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

pub fn router() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

async fn serve(port: u16) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Metrics server listening on {}", listener.local_addr()?);
    axum::serve(listener, router()).await?;
    Ok(())
}

/// Serves `/metrics` on `port` until the process exits.
pub async fn run_server(port: u16) {
    if let Err(e) = serve(port).await {
        error!("Metrics server error: {e}");
    }
}
