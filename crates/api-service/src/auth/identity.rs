//! Verified caller identity and the claims it is built from.

use serde::Deserialize;
use std::fmt;

/// Who the caller is, established from a fully verified token.
///
/// Only the verifier constructs identities from tokens. The type is
/// immutable; clone it to hand copies downstream.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    subject: String,
    email: Option<String>,
}

impl Identity {
    pub fn new(subject: impl Into<String>, email: Option<String>) -> Self {
        Self {
            subject: subject.into(),
            email,
        }
    }

    /// Opaque, stable user identifier (the `sub` claim).
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

/// Custom Debug that redacts user identifiers.
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("subject", &"[REDACTED]")
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Claims read from a token after its signature has been checked.
///
/// Transient: consumed once by [`VerifiedClaims::into_identity`].
#[derive(Clone, Deserialize)]
pub struct VerifiedClaims {
    #[serde(default)]
    pub sub: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    #[serde(default)]
    pub iat: Option<i64>,

    #[serde(default)]
    pub nbf: Option<i64>,

    /// Key that verified the signature. Filled in by the verifier.
    #[serde(skip)]
    pub kid: String,
}

impl VerifiedClaims {
    /// Build the identity, requiring a non-empty subject.
    ///
    /// Returns `None` when `sub` is absent or empty.
    pub fn into_identity(self) -> Option<Identity> {
        let subject = self.sub.filter(|s| !s.is_empty())?;
        let email = self.email.filter(|e| !e.is_empty());
        Some(Identity::new(subject, email))
    }
}

/// Custom Debug that redacts user identifiers.
impl fmt::Debug for VerifiedClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifiedClaims")
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("nbf", &self.nbf)
            .field("kid", &self.kid)
            .finish()
    }
}
