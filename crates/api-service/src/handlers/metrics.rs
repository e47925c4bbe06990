//! Prometheus metrics endpoint handler.
//!
//! The endpoint is unauthenticated. Labels carry no identity or token data.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// ```text
/// # TYPE api_auth_failures_total counter
/// api_auth_failures_total{reason="expired"} 3
/// ```
#[tracing::instrument(skip_all, name = "api.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
