//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Route service requests and latency
//! - Response validation failures
//! - Query cache behavior (de-duplication, aborts, cache size)
//! - Transaction building outcomes

use crate::error::{SwapError, SwapResult};

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_histogram_vec,
    CounterVec, Encoder, Gauge, GaugeVec, HistogramVec, TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    // Route service metrics
    pub static ref ROUTE_SERVICE_REQUESTS: CounterVec = register_counter_vec!(
        "swap_engine_route_service_requests_total",
        "Total route service requests by endpoint and outcome",
        &["endpoint", "outcome"]
    ).unwrap();

    pub static ref ROUTE_SERVICE_LATENCY: HistogramVec = register_histogram_vec!(
        "swap_engine_route_service_latency_seconds",
        "Route service request latency",
        &["endpoint"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();

    pub static ref SCHEMA_VALIDATION_FAILURES: CounterVec = register_counter_vec!(
        "swap_engine_schema_validation_failures_total",
        "Total route service responses rejected by validation",
        &["resource"]
    ).unwrap();

    // Query metrics
    pub static ref FETCH_DEDUPLICATED: CounterVec = register_counter_vec!(
        "swap_engine_fetch_deduplicated_total",
        "Fetches that joined an in-flight request",
        &["query"]
    ).unwrap();

    pub static ref FETCH_ABORTED: CounterVec = register_counter_vec!(
        "swap_engine_fetch_aborted_total",
        "Fetches aborted before they settled",
        &["query"]
    ).unwrap();

    pub static ref FETCH_SKIPPED: CounterVec = register_counter_vec!(
        "swap_engine_fetch_skipped_total",
        "Fetches suppressed because the query could not fetch",
        &["query"]
    ).unwrap();

    pub static ref CACHED_QUERIES: GaugeVec = register_gauge_vec!(
        "swap_engine_cached_queries",
        "Query instances held per store",
        &["store"]
    ).unwrap();

    // Transaction metrics
    pub static ref TX_BUILT: CounterVec = register_counter_vec!(
        "swap_engine_transactions_built_total",
        "Swap transactions built by kind",
        &["kind"]
    ).unwrap();

    pub static ref PRICE_DRIFT_REJECTIONS: CounterVec = register_counter_vec!(
        "swap_engine_price_drift_rejections_total",
        "Transactions rejected because the quote dropped",
        &[]
    ).unwrap();

    // Chain metrics
    pub static ref SUPPORTED_CHAINS: Gauge = register_gauge!(
        "swap_engine_supported_chains",
        "Locally known chains reported by the route service"
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> SwapResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| SwapError::Config(format!("Failed to bind metrics port: {}", e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| SwapError::Internal(format!("Metrics server failed: {}", e)))?;

        Ok(())
    }
}

async fn metrics_handler() -> Result<String, StatusCode> {
    render_metrics().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Encode all registered metrics in the text exposition format
pub fn render_metrics() -> SwapResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| SwapError::Internal(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| SwapError::Internal(e.to_string()))
}

// Helper functions to record metrics

pub fn record_route_service_request(endpoint: &str, success: bool, latency_secs: f64) {
    let outcome = if success { "success" } else { "failure" };
    ROUTE_SERVICE_REQUESTS
        .with_label_values(&[endpoint, outcome])
        .inc();
    ROUTE_SERVICE_LATENCY
        .with_label_values(&[endpoint])
        .observe(latency_secs);
}

pub fn record_schema_validation_failure(resource: &str) {
    SCHEMA_VALIDATION_FAILURES
        .with_label_values(&[resource])
        .inc();
}

pub fn record_fetch_deduplicated(query: &str) {
    FETCH_DEDUPLICATED.with_label_values(&[query]).inc();
}

pub fn record_fetch_aborted(query: &str) {
    FETCH_ABORTED.with_label_values(&[query]).inc();
}

pub fn record_fetch_skipped(query: &str) {
    FETCH_SKIPPED.with_label_values(&[query]).inc();
}

pub fn record_cached_queries(store: &str, count: usize) {
    CACHED_QUERIES
        .with_label_values(&[store])
        .set(count as f64);
}

pub fn record_tx_built(kind: &str) {
    TX_BUILT.with_label_values(&[kind]).inc();
}

pub fn record_price_drift_rejection() {
    PRICE_DRIFT_REJECTIONS.with_label_values(&[]).inc();
}

pub fn record_supported_chains(count: usize) {
    SUPPORTED_CHAINS.set(count as f64);
}
