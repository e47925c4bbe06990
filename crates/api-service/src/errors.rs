//! API error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse` impl.
//! Error messages returned to clients are intentionally generic to avoid
//! leaking internal details. Actual errors are logged server-side.

use crate::auth::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned to clients for every authentication failure.
///
/// Missing headers, bad signatures, unknown keys, expired tokens and JWKS
/// outages all produce this exact text.
pub const INVALID_TOKEN_MESSAGE: &str = "The access token is invalid or expired";

/// API error type.
///
/// Maps to HTTP status codes:
/// - InvalidToken: 401 Unauthorized
/// - BadRequest: 400 Bad Request
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Every authentication failure collapses to the same 401.
impl From<AuthError> for ApiError {
    fn from(_err: AuthError) -> Self {
        ApiError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::InvalidToken(reason) => {
                (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", reason.clone())
            }
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone()),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        // Add WWW-Authenticate header for 401 responses
        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"caselo-api\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    // Helper function to read the response body as JSON
    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_display_invalid_token() {
        let error = ApiError::InvalidToken("expired".to_string());
        assert_eq!(format!("{}", error), "Invalid token: expired");
    }

    #[test]
    fn test_display_bad_request() {
        let error = ApiError::BadRequest("missing query".to_string());
        assert_eq!(format!("{}", error), "Bad request: missing query");
    }

    #[test]
    fn test_every_auth_error_maps_to_same_message() {
        let kinds = [
            AuthError::MissingHeader,
            AuthError::MalformedHeader,
            AuthError::TokenTooLarge,
            AuthError::MalformedToken,
            AuthError::UnknownSigningKey,
            AuthError::UnsupportedAlgorithm,
            AuthError::InvalidSignature,
            AuthError::Expired,
            AuthError::NotYetValid,
            AuthError::InvalidIssuer,
            AuthError::MissingSubject,
            AuthError::KeyResolutionFailure,
        ];

        for kind in kinds {
            let error = ApiError::from(kind);
            assert!(matches!(error, ApiError::InvalidToken(_)));
            assert_eq!(
                error.to_string(),
                format!("Invalid token: {INVALID_TOKEN_MESSAGE}")
            );
        }
    }

    #[tokio::test]
    async fn test_into_response_invalid_token() {
        let response = ApiError::from(AuthError::Expired).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let www_auth = response.headers().get("WWW-Authenticate");
        assert!(www_auth.is_some());
        let www_auth_str = www_auth.unwrap().to_str().unwrap();
        assert!(www_auth_str.contains("Bearer realm=\"caselo-api\""));

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "INVALID_TOKEN");
        assert_eq!(body_json["error"]["message"], INVALID_TOKEN_MESSAGE);
    }

    #[tokio::test]
    async fn test_into_response_key_resolution_failure_is_401_not_5xx() {
        let response = ApiError::from(AuthError::KeyResolutionFailure).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_into_response_bad_request() {
        let error = ApiError::BadRequest("Request body must contain a query".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get("WWW-Authenticate").is_none());

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "BAD_REQUEST");
        assert_eq!(
            body_json["error"]["message"],
            "Request body must contain a query"
        );
    }
}
