//! Token verification for identity-provider JWTs.
//!
//! Validates incoming JWTs using public keys resolved through a
//! [`KeyResolver`] (the JWKS client in production).
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only RS256 is accepted; the header's `alg` is pinned before any key lookup
//! - Expiration, not-before and issued-at claims are validated
//! - The caller only ever sees a generic error (see `ApiError`)

use crate::auth::error::AuthError;
use crate::auth::identity::{Identity, VerifiedClaims};
use crate::auth::jwks::{KeyResolutionError, KeyResolver, SigningKey};
use crate::observability::metrics;
use common::jwt::{parse_header, require_algorithm, validate_iat, RS256};
use jsonwebtoken::{decode, Validation};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Verifies compact JWTs and turns them into identities.
pub struct TokenVerifier {
    resolver: Arc<dyn KeyResolver>,

    /// Clock skew tolerance for iat validation.
    clock_skew: Duration,

    /// Expected `iss`, if any.
    issuer: Option<String>,
}

impl TokenVerifier {
    /// Create a new verifier.
    ///
    /// # Arguments
    ///
    /// * `resolver` - Source of signing keys
    /// * `clock_skew` - Clock skew tolerance for iat validation
    pub fn new(resolver: Arc<dyn KeyResolver>, clock_skew: Duration) -> Self {
        Self {
            resolver,
            clock_skew,
            issuer: None,
        }
    }

    /// Require tokens to carry this `iss` claim.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Verify a token and return the caller's identity.
    ///
    /// # Security Checks
    ///
    /// 1. Size check - reject tokens > 8KB before parsing
    /// 2. Parse the header, requiring a `kid`
    /// 3. Pin the algorithm to RS256
    /// 4. Resolve the signing key by `kid`
    /// 5. Verify the RS256 signature, `exp`, `nbf` and (if configured) `iss`
    /// 6. Validate `iat` with clock skew tolerance
    /// 7. Require a non-empty `sub`
    ///
    /// # Errors
    ///
    /// Returns the specific [`AuthError`] for logging. Callers must not expose
    /// the distinction to clients.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let start = Instant::now();
        let result = self.verify_inner(token).await;

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::record_token_verification(status, start.elapsed());

        result
    }

    async fn verify_inner(&self, token: &str) -> Result<Identity, AuthError> {
        // 1-2. Untrusted header (includes size check via common::jwt)
        let header = parse_header(token).map_err(|e| {
            tracing::debug!(target: "api.auth.jwt", error = ?e, "Token header rejected");
            AuthError::from(e)
        })?;

        // 3. Algorithm pinning before any network traffic
        require_algorithm(&header, RS256)?;

        // 4. Resolve key
        let key = self.resolver.resolve(&header.kid).await.map_err(|e| {
            match e {
                KeyResolutionError::KeyNotFound(_) => {
                    tracing::debug!(target: "api.auth.jwt", kid = %header.kid, "No signing key for token kid");
                    AuthError::UnknownSigningKey
                }
                KeyResolutionError::FetchFailed(_) | KeyResolutionError::ParseFailed(_) => {
                    tracing::warn!(target: "api.auth.jwt", error = %e, "Signing key resolution failed");
                    AuthError::KeyResolutionFailure
                }
            }
        })?;

        // 5. Signature and registered claims
        let mut claims = self.decode_claims(token, &key)?;
        claims.kid = header.kid;

        // 6. iat with clock skew tolerance
        if let Some(iat) = claims.iat {
            validate_iat(iat, self.clock_skew)?;
        }

        // 7. Subject
        let identity = claims.into_identity().ok_or_else(|| {
            tracing::debug!(target: "api.auth.jwt", "Token has no subject");
            AuthError::MissingSubject
        })?;

        tracing::debug!(target: "api.auth.jwt", "Token verified successfully");
        Ok(identity)
    }

    fn decode_claims(&self, token: &str, key: &SigningKey) -> Result<VerifiedClaims, AuthError> {
        let mut validation = Validation::new(key.algorithm());
        validation.set_required_spec_claims(&["exp"]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        // exp and nbf are exact; clock skew applies to iat only
        validation.leeway = 0;
        // Cognito ID tokens carry client IDs as `aud`; not checked here
        validation.validate_aud = false;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let token_data =
            decode::<VerifiedClaims>(token, key.decoding_key(), &validation).map_err(|e| {
                tracing::debug!(target: "api.auth.jwt", error = %e, "Token verification failed");
                AuthError::from(e)
            })?;

        Ok(token_data.claims)
    }

    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }
}
