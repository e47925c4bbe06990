//! Response models for the operational endpoints.

use serde::Serialize;

/// Readiness check response.
///
/// Returned by the `/ready` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready".
    pub status: &'static str,

    /// Signing key set status ("available" or "unavailable").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<&'static str>,

    /// Number of usable signing keys cached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_count: Option<usize>,

    /// Generic error message. Details are only logged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
