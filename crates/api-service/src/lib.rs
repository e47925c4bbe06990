//! API Service Library
//!
//! A GraphQL API guarded by bearer-token authentication. Access tokens are
//! RS256 JWTs issued by an identity provider (e.g. AWS Cognito) and verified
//! against its published JWKS document.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> handlers/*.rs -> graphql/*.rs
//!                        |
//!                  auth/jwt.rs -> auth/jwks.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Key resolution, token verification and request context
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `graphql` - Schema and query resolvers
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication and metrics middleware
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod graphql;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
