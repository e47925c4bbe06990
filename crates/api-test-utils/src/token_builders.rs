//! Builder patterns for test tokens
//!
//! Produces signed access tokens shaped like the ones Cognito issues.

use crate::crypto_fixtures::TestKeypair;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Builder for signed test JWTs.
///
/// # Example
/// ```rust,ignore
/// let keypair = TestKeypair::primary();
/// let token = TestTokenBuilder::new(&keypair)
///     .for_user("alice")
///     .with_email("alice@example.com")
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestTokenBuilder {
    keypair: TestKeypair,
    kid: Option<String>,
    sub: Option<String>,
    email: Option<String>,
    iss: Option<String>,
    exp: i64,
    iat: i64,
    nbf: Option<i64>,
}

impl TestTokenBuilder {
    /// Defaults: subject `test-user`, an email, issued now, valid for an hour,
    /// `kid` taken from the keypair.
    pub fn new(keypair: &TestKeypair) -> Self {
        let now = Utc::now();
        Self {
            keypair: keypair.clone(),
            kid: Some(keypair.kid.clone()),
            sub: Some("test-user".to_string()),
            email: Some("test-user@example.com".to_string()),
            iss: None,
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
            nbf: None,
        }
    }

    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = Some(subject.to_string());
        self
    }

    pub fn without_subject(mut self) -> Self {
        self.sub = None;
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn without_email(mut self) -> Self {
        self.email = None;
        self
    }

    /// Override the header `kid` without changing the signing key.
    pub fn with_kid(mut self, kid: &str) -> Self {
        self.kid = Some(kid.to_string());
        self
    }

    pub fn without_kid(mut self) -> Self {
        self.kid = None;
        self
    }

    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.iss = Some(issuer.to_string());
        self
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Expired an hour ago, well beyond any leeway.
    pub fn expired(mut self) -> Self {
        let now = Utc::now();
        self.exp = (now - Duration::seconds(3600)).timestamp();
        self.iat = (now - Duration::seconds(7200)).timestamp();
        self
    }

    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    pub fn not_before(mut self, timestamp: i64) -> Self {
        self.nbf = Some(timestamp);
        self
    }

    /// The claims as a JSON value.
    pub fn claims(&self) -> Value {
        let mut claims = Map::new();
        if let Some(sub) = &self.sub {
            claims.insert("sub".to_string(), json!(sub));
        }
        if let Some(email) = &self.email {
            claims.insert("email".to_string(), json!(email));
        }
        if let Some(iss) = &self.iss {
            claims.insert("iss".to_string(), json!(iss));
        }
        claims.insert("exp".to_string(), json!(self.exp));
        claims.insert("iat".to_string(), json!(self.iat));
        if let Some(nbf) = self.nbf {
            claims.insert("nbf".to_string(), json!(nbf));
        }
        claims.insert("token_use".to_string(), json!("access"));
        Value::Object(claims)
    }

    /// Sign with RS256 using the builder's keypair.
    pub fn build(self) -> String {
        let key = self.keypair.encoding_key();
        self.sign(Algorithm::RS256, &key)
    }

    /// Sign with HS256 using `secret`.
    pub fn build_hs256(self, secret: &[u8]) -> String {
        self.sign(Algorithm::HS256, &EncodingKey::from_secret(secret))
    }

    /// An `alg: none` token with an empty signature.
    pub fn build_unsigned(self) -> String {
        let mut header = Map::new();
        header.insert("alg".to_string(), json!("none"));
        header.insert("typ".to_string(), json!("JWT"));
        if let Some(kid) = &self.kid {
            header.insert("kid".to_string(), json!(kid));
        }

        let header = URL_SAFE_NO_PAD.encode(Value::Object(header).to_string());
        let payload = URL_SAFE_NO_PAD.encode(self.claims().to_string());
        format!("{header}.{payload}.")
    }

    fn sign(&self, alg: Algorithm, key: &EncodingKey) -> String {
        let mut header = Header::new(alg);
        header.kid = self.kid.clone();
        encode(&header, &self.claims(), key).expect("test token signs")
    }
}

/// Flip one bit of the signature, keeping header and payload intact.
pub fn tamper_signature(token: &str) -> String {
    let (signed, signature) = token.rsplit_once('.').expect("token has a signature");
    let mut bytes = URL_SAFE_NO_PAD
        .decode(signature)
        .expect("signature is base64url");
    if let Some(first) = bytes.first_mut() {
        *first ^= 0x01;
    }
    format!("{signed}.{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// Decode a token's payload without verifying it.
pub fn decode_claims_unverified(token: &str) -> Value {
    let payload = token.split('.').nth(1).expect("token has a payload");
    let bytes = URL_SAFE_NO_PAD.decode(payload).expect("payload is base64url");
    serde_json::from_slice(&bytes).expect("payload is JSON")
}
