//! Query resolvers.

use crate::auth::RequestContext;
use async_graphql::SimpleObject;
use thiserror::Error;

/// Result of the `hello` query.
#[derive(Debug, Clone, PartialEq, Eq, SimpleObject)]
pub struct HelloMessage {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolverError {
    #[error("unauthenticated")]
    Unauthenticated,
}

/// Resolves fields of the `Query` root type.
#[derive(Debug, Clone, Default)]
pub struct QueryResolver;

impl QueryResolver {
    pub fn new() -> Self {
        Self
    }

    /// Greet the authenticated caller by email, or by subject when the
    /// token carried no email.
    ///
    /// # Errors
    ///
    /// Returns `ResolverError::Unauthenticated` when the context has no identity.
    pub fn hello(&self, ctx: &RequestContext) -> Result<HelloMessage, ResolverError> {
        let identity = ctx.identity().ok_or(ResolverError::Unauthenticated)?;
        let name = identity.email().unwrap_or(identity.subject());

        Ok(HelloMessage {
            message: format!("Hello World! How are you doing, {name}?"),
        })
    }
}
