//! Observability for the API service.

pub mod metrics;
