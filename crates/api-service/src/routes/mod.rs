//! HTTP routes for the API service.
//!
//! Defines the Axum router and application state.

use crate::auth::{JwksClient, TokenVerifier};
use crate::config::Config;
use crate::graphql::{build_schema, ApiSchema};
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use http::{header, HeaderValue, Method};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Signing key cache, shared with the verifier and the readiness check.
    pub jwks_client: Arc<JwksClient>,

    /// Bearer token verifier used by `require_auth`.
    pub verifier: Arc<TokenVerifier>,

    /// GraphQL schema executed by the `/graphql` handler.
    pub schema: ApiSchema,
}

impl AppState {
    /// Wire the key cache and verifier from configuration.
    pub fn new(config: Config) -> Self {
        let jwks_client = Arc::new(
            JwksClient::with_options(
                config.jwks_url.clone(),
                config.jwks_cache_ttl,
                config.jwks_fetch_timeout,
            )
            .with_min_refresh_interval(config.jwks_min_refresh_interval),
        );

        let mut verifier = TokenVerifier::new(jwks_client.clone(), config.jwt_clock_skew);
        if let Some(issuer) = &config.jwt_issuer {
            verifier = verifier.with_issuer(issuer.clone());
        }

        Self {
            config,
            jwks_client,
            verifier: Arc::new(verifier),
            schema: build_schema(),
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness check (simple "OK") - public
/// - `/ready` - Readiness check (JWKS resolvable) - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/` - GraphQL playground - public, unless disabled
/// - `/graphql` - GraphQL endpoint - requires authentication
/// - CORS, TraceLayer, 30 second request timeout and HTTP metrics
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        verifier: state.verifier.clone(),
    });
    let cors = cors_layer(&state.config.cors_allowed_origin);

    let mut public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check));

    if state.config.playground_enabled {
        public_routes = public_routes.route("/", get(handlers::playground_handler));
    }

    let public_routes = public_routes.with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route("/graphql", post(handlers::graphql_handler))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. CorsLayer - Answers preflight before auth runs (innermost)
    // 2. TraceLayer - Log request details
    // 3. TimeoutLayer - Timeout the request
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}

fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let origin = if allowed_origin == "*" {
        AllowOrigin::any()
    } else {
        match HeaderValue::from_str(allowed_origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                tracing::warn!(
                    target: "api.routes",
                    "CORS_ALLOWED_ORIGIN is not a valid header value, cross-origin requests disabled"
                );
                AllowOrigin::list(Vec::<HeaderValue>::new())
            }
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
