//! Authentication middleware for protected routes.
//!
//! Extracts the Bearer token from the Authorization header, verifies it with
//! the [`TokenVerifier`], and attaches the resulting identity to the request's
//! [`RequestContext`].

use crate::auth::{AuthError, RequestContext, TokenVerifier};
use crate::errors::ApiError;
use crate::observability::metrics;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http::{header::AUTHORIZATION, HeaderMap};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<TokenVerifier>,
}

/// Authentication middleware that validates bearer JWTs.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - Returns 401 Unauthorized with WWW-Authenticate header if the token is
///   missing or invalid. Downstream is not invoked.
/// - Otherwise continues to the next handler with the identity in the
///   request's `RequestContext`
#[instrument(skip(state, req, next), name = "api.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(req.headers()).map_err(reject)?;
    let identity = state.verifier.verify(token).await.map_err(reject)?;

    metrics::record_auth_success();

    let context = req
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default()
        .with_identity(identity);
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// The scheme is matched literally and must be followed by exactly one
/// space and a non-empty token containing no whitespace.
///
/// # Errors
///
/// - `MissingHeader` - no header, or an empty one
/// - `MalformedHeader` - repeated header, non-ASCII value, wrong scheme, or
///   a token with extra segments
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let mut values = headers.get_all(AUTHORIZATION).iter();

    let value = values.next().ok_or(AuthError::MissingHeader)?;
    if values.next().is_some() {
        return Err(AuthError::MalformedHeader);
    }

    let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
    if value.trim().is_empty() {
        return Err(AuthError::MissingHeader);
    }

    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MalformedHeader)?;

    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::MalformedHeader);
    }

    Ok(token)
}

/// Log and count a failure, then collapse it to the generic 401.
fn reject(err: AuthError) -> ApiError {
    if err == AuthError::KeyResolutionFailure {
        tracing::warn!(target: "api.middleware.auth", reason = err.kind(), "Authentication failed");
    } else {
        tracing::debug!(target: "api.middleware.auth", reason = err.kind(), "Authentication failed");
    }
    metrics::record_auth_failure(err.kind());
    ApiError::from(err)
}
