//! HTTP metrics middleware.
//!
//! Applied as the outermost layer so that every response is counted,
//! including ones produced before a handler runs:
//! - 401 Unauthorized from the auth middleware
//! - 404 Not Found
//! - 405 Method Not Allowed
//! - 408 Request Timeout from the timeout layer

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Record method, normalized path, status code and duration for a request.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed());

    response
}
