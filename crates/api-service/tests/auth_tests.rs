//! Authentication integration tests.
//!
//! Drives `require_auth` against a real `JwksClient` backed by a mocked JWKS
//! endpoint, with an echo handler standing in for downstream.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use api_service::auth::{JwksClient, RequestContext, TokenVerifier};
use api_service::middleware::{require_auth, AuthState};
use api_test_utils::{
    tamper_signature, MockJwks, ResponseAssertions, TestApiServer, TestKeypair, TestTokenBuilder,
};
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::{middleware, routing::get, Json, Router};
use common::jwt::DEFAULT_CLOCK_SKEW;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// Downstream stand-in that counts calls and echoes the identity it saw.
async fn echo_identity(State(calls): State<Arc<AtomicUsize>>, ctx: RequestContext) -> Json<Value> {
    calls.fetch_add(1, Ordering::SeqCst);
    let identity = ctx.identity();
    Json(json!({
        "subject": identity.map(|i| i.subject()),
        "email": identity.and_then(|i| i.email()),
    }))
}

/// Protected echo router plus its downstream call counter.
struct EchoApp {
    router: Router,
    calls: Arc<AtomicUsize>,
    jwks: MockJwks,
}

impl EchoApp {
    async fn new(published: &[&TestKeypair]) -> Self {
        let jwks = MockJwks::serving(published).await;
        let client = Arc::new(JwksClient::new(jwks.url()));
        let verifier = Arc::new(TokenVerifier::new(client, DEFAULT_CLOCK_SKEW));
        let auth_state = Arc::new(AuthState { verifier });

        let calls = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route("/echo", get(echo_identity))
            .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
            .with_state(calls.clone());

        Self {
            router,
            calls,
            jwks,
        }
    }

    async fn send(&self, authorization: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::get("/echo");
        if let Some(value) = authorization {
            request = request.header(header::AUTHORIZATION, value);
        }
        let response = self
            .router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn send_token(&self, token: &str) -> (StatusCode, Value) {
        self.send(Some(&format!("Bearer {token}"))).await
    }

    fn downstream_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Header handling
// ============================================================================

#[tokio::test]
async fn test_missing_header_never_reaches_downstream() {
    let app = EchoApp::new(&[&TestKeypair::primary()]).await;

    let (status, body) = app.send(None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    body.assert_invalid_token();
    assert_eq!(app.downstream_calls(), 0);
}

#[tokio::test]
async fn test_malformed_headers_rejected() {
    let keypair = TestKeypair::primary();
    let app = EchoApp::new(&[&keypair]).await;
    let token = TestTokenBuilder::new(&keypair).build();

    let malformed = [
        String::new(),
        "Bearer".to_string(),
        "Bearer ".to_string(),
        format!("bearer {token}"),
        format!("Basic {token}"),
        format!("Bearer  {token}"),
        format!("Bearer {token} extra"),
        token.clone(),
    ];

    for value in &malformed {
        let (status, body) = app.send(Some(value)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "header {value:?}");
        body.assert_invalid_token();
    }
    assert_eq!(app.downstream_calls(), 0);
}

// ============================================================================
// Token verification
// ============================================================================

#[tokio::test]
async fn test_valid_token_reaches_downstream_with_identity() {
    let keypair = TestKeypair::primary();
    let app = EchoApp::new(&[&keypair]).await;
    let token = TestTokenBuilder::new(&keypair)
        .for_user("u1")
        .with_email("u1@example.com")
        .build();

    let (status, body) = app.send_token(&token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"subject": "u1", "email": "u1@example.com"}));
    assert_eq!(app.downstream_calls(), 1);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let keypair = TestKeypair::primary();
    let app = EchoApp::new(&[&keypair]).await;
    let token = TestTokenBuilder::new(&keypair).expired().build();

    let (status, body) = app.send_token(&token).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    body.assert_invalid_token();
    assert_eq!(app.downstream_calls(), 0);
}

#[tokio::test]
async fn test_token_expired_seconds_ago_rejected() {
    let keypair = TestKeypair::primary();
    let app = EchoApp::new(&[&keypair]).await;
    let token = TestTokenBuilder::new(&keypair)
        .for_user("late")
        .issued_at(chrono::Utc::now().timestamp() - 600)
        .expires_in(-30)
        .build();

    let (status, body) = app.send_token(&token).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    body.assert_invalid_token();
    assert_eq!(app.downstream_calls(), 0);
}

#[tokio::test]
async fn test_token_not_yet_valid_rejected() {
    let keypair = TestKeypair::primary();
    let app = EchoApp::new(&[&keypair]).await;
    let token = TestTokenBuilder::new(&keypair)
        .for_user("early")
        .not_before(chrono::Utc::now().timestamp() + 30)
        .build();

    let (status, body) = app.send_token(&token).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    body.assert_invalid_token();
    assert_eq!(app.downstream_calls(), 0);
}

#[tokio::test]
async fn test_unknown_kid_rejected() {
    let app = EchoApp::new(&[&TestKeypair::primary()]).await;
    let token = TestTokenBuilder::new(&TestKeypair::secondary()).build();

    let (status, body) = app.send_token(&token).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    body.assert_invalid_token();
    assert_eq!(app.downstream_calls(), 0);
}

#[tokio::test]
async fn test_tampered_signature_rejected() {
    let keypair = TestKeypair::primary();
    let app = EchoApp::new(&[&keypair]).await;
    let token = tamper_signature(&TestTokenBuilder::new(&keypair).build());

    let (status, _) = app.send_token(&token).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.downstream_calls(), 0);
}

#[tokio::test]
async fn test_wrong_key_under_trusted_kid_rejected() {
    let trusted = TestKeypair::primary();
    let app = EchoApp::new(&[&trusted]).await;
    let forged = TestKeypair::secondary().with_kid(&trusted.kid);
    let token = TestTokenBuilder::new(&forged).build();

    let (status, _) = app.send_token(&token).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.downstream_calls(), 0);
}

#[tokio::test]
async fn test_algorithm_pinned_to_rs256() {
    let keypair = TestKeypair::primary();
    let app = EchoApp::new(&[&keypair]).await;

    let hs256 = TestTokenBuilder::new(&keypair).build_hs256(keypair.modulus.as_bytes());
    let none = TestTokenBuilder::new(&keypair).build_unsigned();

    for token in [hs256, none] {
        let (status, body) = app.send_token(&token).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        body.assert_invalid_token();
    }

    assert_eq!(app.downstream_calls(), 0);
    // Rejected before any key lookup
    assert_eq!(app.jwks.fetch_count().await, 0);
}

#[tokio::test]
async fn test_failures_are_indistinguishable() {
    let keypair = TestKeypair::primary();
    let app = EchoApp::new(&[&keypair]).await;

    let expired = TestTokenBuilder::new(&keypair).expired().build();
    let unknown = TestTokenBuilder::new(&TestKeypair::secondary()).build();
    let tampered = tamper_signature(&TestTokenBuilder::new(&keypair).build());

    let (_, missing_body) = app.send(None).await;
    for token in [expired, unknown, tampered] {
        let (status, body) = app.send_token(&token).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, missing_body);
    }
}

#[tokio::test]
async fn test_verification_is_idempotent() {
    let keypair = TestKeypair::primary();
    let jwks = MockJwks::serving(&[&keypair]).await;
    let verifier = TokenVerifier::new(Arc::new(JwksClient::new(jwks.url())), DEFAULT_CLOCK_SKEW);
    let token = TestTokenBuilder::new(&keypair)
        .for_user("u1")
        .with_email("u1@example.com")
        .build();

    let first = verifier.verify(&token).await.unwrap();
    let second = verifier.verify(&token).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.subject(), "u1");
}

#[tokio::test]
async fn test_concurrent_requests_keep_identities_separate() {
    const N: usize = 64;

    let keypair = TestKeypair::primary();
    let app = Arc::new(EchoApp::new(&[&keypair]).await);

    let tasks: Vec<_> = (0..N)
        .map(|i| {
            let app = Arc::clone(&app);
            let token = TestTokenBuilder::new(&keypair)
                .for_user(&format!("user-{i}"))
                .with_email(&format!("user-{i}@example.com"))
                .build();
            tokio::spawn(async move { (i, app.send_token(&token).await) })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        let (i, (status, body)) = result.unwrap();
        assert_eq!(status, StatusCode::OK, "request {i}");
        assert_eq!(
            body,
            json!({"subject": format!("user-{i}"), "email": format!("user-{i}@example.com")}),
            "request {i} saw another caller's identity"
        );
    }

    assert_eq!(app.downstream_calls(), N);
    // Cold-cache misses coalesce into one fetch
    assert_eq!(app.jwks.fetch_count().await, 1);
}

// ============================================================================
// End to end through the real router
// ============================================================================

#[tokio::test]
async fn test_graphql_hello_end_to_end() -> Result<()> {
    let keypair = TestKeypair::primary();
    let jwks = MockJwks::serving(&[&keypair]).await;
    let server = TestApiServer::spawn(&jwks.url()).await?;

    let token = TestTokenBuilder::new(&keypair)
        .for_user("u1")
        .with_email("u1@example.com")
        .build();
    let response = server.graphql(Some(&token), "{ hello { message } }").await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    body.assert_greets("u1@example.com");
    Ok(())
}

#[tokio::test]
async fn test_graphql_greets_by_subject_without_email() -> Result<()> {
    let keypair = TestKeypair::primary();
    let jwks = MockJwks::serving(&[&keypair]).await;
    let server = TestApiServer::spawn(&jwks.url()).await?;

    let token = TestTokenBuilder::new(&keypair)
        .for_user("u2")
        .without_email()
        .build();
    let body: Value = server
        .graphql(Some(&token), "{ hello { message } }")
        .await?
        .json()
        .await?;

    body.assert_greets("u2");
    Ok(())
}

#[tokio::test]
async fn test_graphql_unauthenticated_end_to_end() -> Result<()> {
    let jwks = MockJwks::serving(&[&TestKeypair::primary()]).await;
    let server = TestApiServer::spawn(&jwks.url()).await?;

    let response = server.graphql(None, "{ hello { message } }").await?;

    assert_eq!(response.status(), 401);
    let challenge = response
        .headers()
        .get("www-authenticate")
        .expect("401 carries a challenge")
        .to_str()?
        .to_string();
    assert!(challenge.starts_with("Bearer"));
    assert!(challenge.contains("error=\"invalid_token\""));

    let body: Value = response.json().await?;
    body.assert_invalid_token();
    Ok(())
}

#[tokio::test]
async fn test_issuer_enforced_when_configured() -> Result<()> {
    let keypair = TestKeypair::primary();
    let jwks = MockJwks::serving(&[&keypair]).await;
    let issuer = "https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_TEST";
    let server = TestApiServer::spawn_with_vars(&jwks.url(), &[("JWT_ISSUER", issuer)]).await?;

    let good = TestTokenBuilder::new(&keypair).with_issuer(issuer).build();
    let response = server.graphql(Some(&good), "{ hello { message } }").await?;
    assert_eq!(response.status(), 200);

    let bad = TestTokenBuilder::new(&keypair)
        .with_issuer("https://evil.example.com")
        .build();
    let response = server.graphql(Some(&bad), "{ hello { message } }").await?;
    assert_eq!(response.status(), 401);
    Ok(())
}
