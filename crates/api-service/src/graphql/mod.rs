//! GraphQL surface of the API.
//!
//! The schema has a single root field:
//!
//! ```graphql
//! type Query { hello: HelloMessage! }
//! type HelloMessage { message: String! }
//! ```
//!
//! Parsing, validation, variables and execution are handled by
//! `async-graphql`. The caller's `RequestContext` is attached to each
//! request as per-request data by the HTTP handler.
//!
//! # Components
//!
//! - `resolver` - Field resolvers, reading the caller from `RequestContext`

pub mod resolver;

pub use resolver::{HelloMessage, QueryResolver, ResolverError};

use crate::auth::RequestContext;
use async_graphql::{Context, EmptyMutation, EmptySubscription, Object, Schema};

/// The API schema.
pub type ApiSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

/// Root `Query` type.
#[derive(Debug, Clone, Default)]
pub struct QueryRoot {
    resolver: QueryResolver,
}

#[Object(name = "Query")]
impl QueryRoot {
    /// Greets the authenticated caller.
    async fn hello(&self, ctx: &Context<'_>) -> async_graphql::Result<HelloMessage> {
        let request_ctx = ctx
            .data_opt::<RequestContext>()
            .ok_or(ResolverError::Unauthenticated)?;

        Ok(self.resolver.hello(request_ctx)?)
    }
}

/// Build the schema served at `/graphql`.
pub fn build_schema() -> ApiSchema {
    Schema::build(QueryRoot::default(), EmptyMutation, EmptySubscription).finish()
}
