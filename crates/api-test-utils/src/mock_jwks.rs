//! Mock identity provider JWKS endpoint
//!
//! Wraps a wiremock server publishing test keypairs at the Cognito path.

use crate::crypto_fixtures::{jwks_document, TestKeypair};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path Cognito serves the key set on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// A running JWKS endpoint.
///
/// # Example
/// ```rust,ignore
/// let jwks = MockJwks::serving(&[&TestKeypair::primary()]).await;
/// let client = JwksClient::new(jwks.url());
/// ```
pub struct MockJwks {
    server: MockServer,
}

impl MockJwks {
    /// Start a server with nothing mounted.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Start a server publishing `keypairs`.
    pub async fn serving(keypairs: &[&TestKeypair]) -> Self {
        let jwks = Self::start().await;
        jwks.publish(keypairs).await;
        jwks
    }

    /// Full URL of the JWKS document.
    pub fn url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Replace whatever is mounted with a document publishing `keypairs`.
    ///
    /// Resets recorded requests.
    pub async fn publish(&self, keypairs: &[&TestKeypair]) {
        self.respond_with(ResponseTemplate::new(200).set_body_json(jwks_document(keypairs)))
            .await;
    }

    /// Like [`publish`](Self::publish), but every response is delayed.
    pub async fn publish_with_delay(&self, keypairs: &[&TestKeypair], delay: Duration) {
        self.respond_with(
            ResponseTemplate::new(200)
                .set_body_json(jwks_document(keypairs))
                .set_delay(delay),
        )
        .await;
    }

    /// Respond to every fetch with `status` and an empty body.
    pub async fn fail_with(&self, status: u16) {
        self.respond_with(ResponseTemplate::new(status)).await;
    }

    /// Respond with a 200 whose body is `body` verbatim.
    pub async fn serve_raw(&self, body: &str) {
        self.respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(body),
        )
        .await;
    }

    /// Number of JWKS fetches since the last mount.
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| {
                requests
                    .iter()
                    .filter(|r| r.url.path() == JWKS_PATH)
                    .count()
            })
            .unwrap_or(0)
    }

    async fn respond_with(&self, template: ResponseTemplate) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }
}
