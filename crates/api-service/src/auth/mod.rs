//! Authentication for the API.
//!
//! # Components
//!
//! - `jwks` - Key Resolver: fetches and caches the identity provider's JWKS
//! - `jwt` - Token Verifier: RS256 signature and claim validation
//! - `identity` - Verified identity and the claims it is built from
//! - `context` - Request-scoped identity propagation
//! - `error` - Internal failure taxonomy

pub mod context;
pub mod error;
pub mod identity;
pub mod jwks;
pub mod jwt;

pub use context::RequestContext;
pub use error::AuthError;
pub use identity::Identity;
pub use jwks::{JwksClient, KeyResolutionError, KeyResolver, SigningKey};
pub use jwt::TokenVerifier;
