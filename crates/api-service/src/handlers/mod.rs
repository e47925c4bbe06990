//! HTTP request handlers for the API service.

pub mod graphql;
pub mod health;
pub mod metrics;
pub mod playground;

pub use graphql::graphql_handler;
pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
pub use playground::playground_handler;
