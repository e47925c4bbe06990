//! GraphQL endpoint and public route integration tests.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use api_test_utils::{MockJwks, ResponseAssertions, TestApiServer, TestKeypair, TestTokenBuilder};
use serde_json::{json, Value};

struct Fixture {
    server: TestApiServer,
    token: String,
    _jwks: MockJwks,
}

async fn fixture() -> Result<Fixture> {
    fixture_with(&[]).await
}

async fn fixture_with(extra: &[(&str, &str)]) -> Result<Fixture> {
    let keypair = TestKeypair::primary();
    let jwks = MockJwks::serving(&[&keypair]).await;
    let server = TestApiServer::spawn_with_vars(&jwks.url(), extra).await?;
    let token = TestTokenBuilder::new(&keypair)
        .for_user("u1")
        .with_email("u1@example.com")
        .build();

    Ok(Fixture {
        server,
        token,
        _jwks: jwks,
    })
}

#[tokio::test]
async fn test_hello_with_alias_and_typename() -> Result<()> {
    let f = fixture().await?;

    let body: Value = f
        .server
        .graphql(Some(&f.token), "query Greeting { hi: hello { message __typename } }")
        .await?
        .json()
        .await?;

    assert_eq!(
        body,
        json!({"data": {"hi": {
            "message": "Hello World! How are you doing, u1@example.com?",
            "__typename": "HelloMessage"
        }}})
    );
    Ok(())
}

#[tokio::test]
async fn test_unknown_field_is_graphql_error() -> Result<()> {
    let f = fixture().await?;

    let response = f.server.graphql(Some(&f.token), "{ goodbye }").await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert!(body["data"].is_null());
    body.assert_graphql_error("Unknown field \"goodbye\" on type \"Query\"");
    Ok(())
}

#[tokio::test]
async fn test_mutation_is_graphql_error() -> Result<()> {
    let f = fixture().await?;

    let body: Value = f
        .server
        .graphql(Some(&f.token), "mutation { hello { message } }")
        .await?
        .json()
        .await?;

    body.assert_graphql_error("Schema is not configured for mutations");
    Ok(())
}

#[tokio::test]
async fn test_variables_are_applied() -> Result<()> {
    let f = fixture().await?;
    let query = "query Greet($withMessage: Boolean!) { hello { message @include(if: $withMessage) __typename } }";

    let send = |with_message: bool| {
        f.server
            .client()
            .post(format!("{}/graphql", f.server.url()))
            .bearer_auth(&f.token)
            .json(&json!({
                "query": query,
                "operationName": "Greet",
                "variables": {"withMessage": with_message}
            }))
            .send()
    };

    let included: Value = send(true).await?.json().await?;
    included.assert_greets("u1@example.com");

    let skipped: Value = send(false).await?.json().await?;
    assert_eq!(
        skipped,
        json!({"data": {"hello": {"__typename": "HelloMessage"}}})
    );
    Ok(())
}

#[tokio::test]
async fn test_unknown_operation_name_is_graphql_error() -> Result<()> {
    let f = fixture().await?;

    let body: Value = f
        .server
        .client()
        .post(format!("{}/graphql", f.server.url()))
        .bearer_auth(&f.token)
        .json(&json!({"query": "query A { hello { message } }", "operationName": "B"}))
        .send()
        .await?
        .json()
        .await?;

    body.assert_graphql_error("Unknown operation named \"B\"");
    Ok(())
}

#[tokio::test]
async fn test_missing_query_is_bad_request() -> Result<()> {
    let f = fixture().await?;

    let response = f
        .server
        .client()
        .post(format!("{}/graphql", f.server.url()))
        .bearer_auth(&f.token)
        .json(&json!({"variables": {}}))
        .send()
        .await?;

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    Ok(())
}

#[tokio::test]
async fn test_auth_checked_before_body() -> Result<()> {
    let f = fixture().await?;

    let response = f
        .server
        .client()
        .post(format!("{}/graphql", f.server.url()))
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await?;

    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn test_get_graphql_not_allowed() -> Result<()> {
    let f = fixture().await?;

    let response = f
        .server
        .client()
        .get(format!("{}/graphql", f.server.url()))
        .bearer_auth(&f.token)
        .send()
        .await?;

    assert_eq!(response.status(), 405);
    Ok(())
}

// ============================================================================
// Public routes
// ============================================================================

#[tokio::test]
async fn test_cors_preflight_without_credentials() -> Result<()> {
    let f = fixture_with(&[("CORS_ALLOWED_ORIGIN", "https://app.example.com")]).await?;

    let response = f
        .server
        .client()
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/graphql", f.server.url()),
        )
        .header("origin", "https://app.example.com")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "authorization, content-type")
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let headers = response.headers();
    assert_eq!(
        headers["access-control-allow-origin"],
        "https://app.example.com"
    );
    let methods = headers["access-control-allow-methods"].to_str()?;
    assert!(methods.contains("POST"));
    let allowed = headers["access-control-allow-headers"]
        .to_str()?
        .to_ascii_lowercase();
    assert!(allowed.contains("authorization"));
    assert!(allowed.contains("content-type"));
    Ok(())
}

#[tokio::test]
async fn test_cors_headers_on_actual_request() -> Result<()> {
    let f = fixture().await?;

    let response = f
        .server
        .client()
        .post(format!("{}/graphql", f.server.url()))
        .header("origin", "https://anywhere.example.com")
        .bearer_auth(&f.token)
        .json(&json!({"query": "{ hello { message } }"}))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    Ok(())
}

#[tokio::test]
async fn test_playground_served_at_root() -> Result<()> {
    let f = fixture().await?;

    let response = reqwest::get(format!("{}/", f.server.url())).await?;

    assert_eq!(response.status(), 200);
    assert!(response.headers()["content-type"]
        .to_str()?
        .starts_with("text/html"));
    assert!(response.text().await?.contains("/graphql"));
    Ok(())
}

#[tokio::test]
async fn test_playground_can_be_disabled() -> Result<()> {
    let f = fixture_with(&[("PLAYGROUND_ENABLED", "false")]).await?;

    let response = reqwest::get(format!("{}/", f.server.url())).await?;

    assert_eq!(response.status(), 404);
    Ok(())
}

#[tokio::test]
async fn test_health_is_public() -> Result<()> {
    let f = fixture().await?;

    let response = reqwest::get(format!("{}/health", f.server.url())).await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");
    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_is_public() -> Result<()> {
    let f = fixture().await?;

    let response = reqwest::get(format!("{}/metrics", f.server.url())).await?;

    assert_eq!(response.status(), 200);
    Ok(())
}
