//! Authentication failure taxonomy.
//!
//! These distinctions exist for logs and metrics only. At the HTTP boundary
//! every variant becomes the same generic 401 (see [`crate::errors::ApiError`]).

use common::jwt::JwtValidationError;
use thiserror::Error;

/// Why a request failed authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization` header, or an empty one.
    #[error("authorization header missing")]
    MissingHeader,

    /// Header present but not `Bearer <token>`.
    #[error("authorization header malformed")]
    MalformedHeader,

    /// Token exceeds the size limit.
    #[error("token too large")]
    TokenTooLarge,

    /// Not a compact JWS, bad base64/JSON, or no `kid`.
    #[error("token malformed")]
    MalformedToken,

    /// The JWKS document has no key for the token's `kid`.
    #[error("unknown signing key")]
    UnknownSigningKey,

    /// Header declares an algorithm other than RS256, or none at all.
    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    /// `nbf` in the future, or `iat` beyond the allowed clock skew.
    #[error("token not yet valid")]
    NotYetValid,

    #[error("invalid issuer")]
    InvalidIssuer,

    #[error("subject claim missing")]
    MissingSubject,

    /// The JWKS endpoint could not be fetched or parsed.
    #[error("signing key resolution failed")]
    KeyResolutionFailure,
}

impl AuthError {
    /// Stable label for logs and the `reason` metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "missing_header",
            AuthError::MalformedHeader => "malformed_header",
            AuthError::TokenTooLarge => "token_too_large",
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnknownSigningKey => "unknown_signing_key",
            AuthError::UnsupportedAlgorithm => "unsupported_algorithm",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Expired => "expired",
            AuthError::NotYetValid => "not_yet_valid",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::MissingSubject => "missing_subject",
            AuthError::KeyResolutionFailure => "key_resolution_failure",
        }
    }
}

impl From<JwtValidationError> for AuthError {
    fn from(err: JwtValidationError) -> Self {
        match err {
            JwtValidationError::TokenTooLarge => AuthError::TokenTooLarge,
            JwtValidationError::MalformedToken | JwtValidationError::MissingKid => {
                AuthError::MalformedToken
            }
            JwtValidationError::UnsupportedAlgorithm => AuthError::UnsupportedAlgorithm,
            JwtValidationError::IatTooFarInFuture => AuthError::NotYetValid,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::ImmatureSignature => AuthError::NotYetValid,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::InvalidAlgorithm => AuthError::UnsupportedAlgorithm,
            ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
            _ => AuthError::MalformedToken,
        }
    }
}
