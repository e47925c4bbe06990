//! GraphQL playground page.

use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use axum::response::Html;

/// Handler for GET /
pub async fn playground_handler() -> Html<String> {
    Html(playground_source(
        GraphQLPlaygroundConfig::new("/graphql").with_setting("request.credentials", "same-origin"),
    ))
}
