//! GraphQL endpoint handler.

use crate::auth::RequestContext;
use crate::errors::ApiError;
use crate::routes::AppState;
use async_graphql::{Request, Response};
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

/// Handler for POST /graphql
///
/// Runs behind `require_auth`, so the context carries the caller's identity.
/// The context is attached to the GraphQL request so resolvers can read it.
/// Query-level failures are reported in the `errors` array with a 200.
///
/// # Errors
///
/// Returns `ApiError::BadRequest` if the body has no query.
#[tracing::instrument(skip_all, name = "api.graphql.execute")]
pub async fn graphql_handler(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Json(request): Json<Request>,
) -> Result<Json<Response>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Request body must include a query".to_string(),
        ));
    }

    if let Some(operation) = request.operation_name.as_deref() {
        tracing::debug!(target: "api.graphql", operation = operation, "Executing operation");
    }

    let response = state.schema.execute(request.data(ctx)).await;
    if response.is_err() {
        tracing::debug!(
            target: "api.graphql",
            errors = response.errors.len(),
            "Query completed with errors"
        );
    }

    Ok(Json(response))
}
