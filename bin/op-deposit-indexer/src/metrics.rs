//! Prometheus metrics HTTP endpoint for the deposit indexer binary.
//!
//! The counters and gauges themselves are registered in `op-deposit-indexer` and
//! `op-deposit-providers-alloy` behind their respective `metrics` features, next to the code
//! that updates them. `prometheus::gather()` collects from the process-wide registry
//! regardless of which crate registered a metric, so this module only needs to serve it.

use actix_web::{get, App, HttpServer, Responder};
use anyhow::Result;
use prometheus::{self, Encoder, TextEncoder};

/// Starts the metrics HTTP server, serving Prometheus text format at `/metrics`.
pub async fn serve_metrics(bind: &str) -> Result<()> {
    HttpServer::new(|| App::new().service(index).service(metrics))
        .bind(bind)
        .map_err(|e| anyhow::anyhow!(e))?
        .run()
        .await
        .map_err(|e| anyhow::anyhow!(e))
}

#[get("/")]
async fn index() -> impl Responder {
    "op-deposit-indexer-metrics-server: visit /metrics to view metrics"
}

#[get("/metrics")]
async fn metrics() -> impl Responder {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!("failed to encode prometheus metrics: {:?}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
