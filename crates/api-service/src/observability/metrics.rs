//! Metrics definitions for the API service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `api_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: 6 values (known paths plus `/other`)
//! - `status`: 3 values (success, error, timeout)
//! - `reason`: bounded by `AuthError::kind()` labels
//!
//! # Alerting
//!
//! `api_jwks_refresh_total{status="error"}` rising means the identity
//! provider's JWKS endpoint is unreachable and every request is being
//! rejected with 401.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // HTTP request buckets aligned with 200ms p95 target
        .set_buckets_for_metric(
            Matcher::Prefix("api_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Token verification is CPU-bound except on a cache miss
        .set_buckets_for_metric(
            Matcher::Prefix("api_token_verification".to_string()),
            &[
                0.0005, 0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set token verification buckets: {e}"))?
        // JWKS fetches are bounded by the fetch timeout
        .set_buckets_for_metric(
            Matcher::Prefix("api_jwks_refresh".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set JWKS refresh buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `api_http_requests_total`, `api_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// This captures ALL HTTP responses including framework-level errors like
/// 404 Not Found and 405 Method Not Allowed.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("api_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("api_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto a fixed label set.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/graphql" => "/graphql",
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        // Unknown paths normalized to "/other" to bound cardinality
        _ => "/other",
    }
}

// ============================================================================
// Authentication Metrics
// ============================================================================

/// Record a rejected request.
///
/// Metric: `api_auth_failures_total`
/// Labels: `reason` (an `AuthError::kind()` label)
pub fn record_auth_failure(reason: &'static str) {
    counter!("api_auth_failures_total", "reason" => reason).increment(1);
}

/// Metric: `api_auth_success_total`
pub fn record_auth_success() {
    counter!("api_auth_success_total").increment(1);
}

/// Record a token verification.
///
/// Metric: `api_token_verification_duration_seconds`, `api_token_verifications_total`
/// Labels: `status`
pub fn record_token_verification(status: &'static str, duration: Duration) {
    histogram!("api_token_verification_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());

    counter!("api_token_verifications_total", "status" => status).increment(1);
}

// ============================================================================
// JWKS Metrics
// ============================================================================

/// Record a JWKS fetch attempt.
///
/// Metric: `api_jwks_refresh_total`, `api_jwks_refresh_duration_seconds`
/// Labels: `status` (success, error)
pub fn record_jwks_refresh(status: &'static str, duration: Duration) {
    histogram!("api_jwks_refresh_duration_seconds").record(duration.as_secs_f64());

    counter!("api_jwks_refresh_total", "status" => status).increment(1);
}

/// Metric: `api_jwks_cache_total`
/// Labels: `result` (hit, miss)
pub fn record_jwks_cache(result: &'static str) {
    counter!("api_jwks_cache_total", "result" => result).increment(1);
}
