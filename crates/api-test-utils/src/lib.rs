//! # API Test Utilities
//!
//! Shared test utilities for the API service.
//!
//! This crate provides:
//! - Fixed RSA keypairs (reproducible tokens and JWKS documents)
//! - Token builders (`TestTokenBuilder`, `tamper_signature`)
//! - A wiremock-backed JWKS endpoint (`MockJwks`)
//! - Server test harness (`TestApiServer` for E2E tests)
//! - Custom assertions (`ResponseAssertions` trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use api_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let keypair = TestKeypair::primary();
//!     let jwks = MockJwks::serving(&[&keypair]).await;
//!     let server = TestApiServer::spawn(&jwks.url()).await?;
//!
//!     let token = TestTokenBuilder::new(&keypair)
//!         .with_email("alice@example.com")
//!         .build();
//!
//!     let body: serde_json::Value = server
//!         .graphql(Some(&token), "{ hello { message } }")
//!         .await?
//!         .json()
//!         .await?;
//!     body.assert_greets("alice@example.com");
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod mock_jwks;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use mock_jwks::*;
pub use server_harness::*;
pub use token_builders::*;
