//! API service configuration.
//!
//! Configuration is loaded from environment variables. The JWKS URL is either
//! given directly or assembled from the Cognito endpoint and user pool ID.

use crate::auth::jwks::{
    DEFAULT_CACHE_TTL_SECONDS, DEFAULT_FETCH_TIMEOUT_SECONDS, DEFAULT_MIN_REFRESH_SECONDS,
};
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default CORS origin (any).
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "*";

/// API service configuration.
///
/// Loaded from environment variables with sensible defaults.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// URL of the identity provider's JWKS document.
    pub jwks_url: String,

    /// Expected `iss` claim. Not checked when `None`.
    pub jwt_issuer: Option<String>,

    /// JWT clock skew tolerance for `iat` validation.
    pub jwt_clock_skew: Duration,

    /// How long a fetched JWKS document is trusted.
    pub jwks_cache_ttl: Duration,

    /// Upper bound on a single JWKS request.
    pub jwks_fetch_timeout: Duration,

    /// Minimum time between JWKS refreshes triggered by an unknown `kid`.
    pub jwks_min_refresh_interval: Duration,

    /// `Access-Control-Allow-Origin` value; `*` allows any origin.
    pub cors_allowed_origin: String,

    /// Serve the GraphQL playground at `/`.
    pub playground_enabled: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("jwks_url", &self.jwks_url)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew.as_secs())
            .field("jwks_cache_ttl_seconds", &self.jwks_cache_ttl.as_secs())
            .field(
                "jwks_fetch_timeout_seconds",
                &self.jwks_fetch_timeout.as_secs(),
            )
            .field(
                "jwks_min_refresh_seconds",
                &self.jwks_min_refresh_interval.as_secs(),
            )
            .field("cors_allowed_origin", &self.cors_allowed_origin)
            .field("playground_enabled", &self.playground_enabled)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid duration configuration: {0}")]
    InvalidDuration(String),

    #[error("Invalid boolean configuration: {0}")]
    InvalidBoolean(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let jwks_url = jwks_url_from_vars(vars)?;

        let bind_address = non_empty(vars, "BIND_ADDRESS")
            .unwrap_or(DEFAULT_BIND_ADDRESS)
            .to_string();

        let jwt_issuer = non_empty(vars, "JWT_ISSUER").map(ToString::to_string);

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew = if let Some(value_str) = non_empty(vars, "JWT_CLOCK_SKEW_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidJwtClockSkew(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got 0".to_string(),
                ));
            }

            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            Duration::from_secs(value)
        } else {
            DEFAULT_CLOCK_SKEW
        };

        let jwks_cache_ttl =
            positive_seconds(vars, "JWKS_CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL_SECONDS)?;
        let jwks_fetch_timeout = positive_seconds(
            vars,
            "JWKS_FETCH_TIMEOUT_SECONDS",
            DEFAULT_FETCH_TIMEOUT_SECONDS,
        )?;
        let jwks_min_refresh_interval = positive_seconds(
            vars,
            "JWKS_MIN_REFRESH_SECONDS",
            DEFAULT_MIN_REFRESH_SECONDS,
        )?;

        let cors_allowed_origin = non_empty(vars, "CORS_ALLOWED_ORIGIN")
            .unwrap_or(DEFAULT_CORS_ALLOWED_ORIGIN)
            .to_string();

        let playground_enabled = match non_empty(vars, "PLAYGROUND_ENABLED") {
            Some(value) => parse_bool("PLAYGROUND_ENABLED", value)?,
            None => true,
        };

        Ok(Config {
            bind_address,
            jwks_url,
            jwt_issuer,
            jwt_clock_skew,
            jwks_cache_ttl,
            jwks_fetch_timeout,
            jwks_min_refresh_interval,
            cors_allowed_origin,
            playground_enabled,
        })
    }
}

/// `JWKS_URL` wins; otherwise `{COGNITO_ENDPOINT}/{COGNITO_USER_POOL_ID}/.well-known/jwks.json`.
fn jwks_url_from_vars(vars: &HashMap<String, String>) -> Result<String, ConfigError> {
    if let Some(url) = non_empty(vars, "JWKS_URL") {
        return Ok(url.to_string());
    }

    match (
        non_empty(vars, "COGNITO_ENDPOINT"),
        non_empty(vars, "COGNITO_USER_POOL_ID"),
    ) {
        (Some(endpoint), Some(pool_id)) => Ok(format!(
            "{}/{}/.well-known/jwks.json",
            endpoint.trim_end_matches('/'),
            pool_id
        )),
        (Some(_), None) => Err(ConfigError::MissingEnvVar(
            "COGNITO_USER_POOL_ID".to_string(),
        )),
        (None, Some(_)) => Err(ConfigError::MissingEnvVar("COGNITO_ENDPOINT".to_string())),
        (None, None) => Err(ConfigError::MissingEnvVar(
            "JWKS_URL (or COGNITO_ENDPOINT and COGNITO_USER_POOL_ID)".to_string(),
        )),
    }
}

fn non_empty<'a>(vars: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    vars.get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn positive_seconds(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let Some(value_str) = non_empty(vars, name) else {
        return Ok(Duration::from_secs(default));
    };

    let value: u64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidDuration(format!(
            "{} must be a valid positive integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidDuration(format!(
            "{} must be greater than 0",
            name
        )));
    }

    Ok(Duration::from_secs(value))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBoolean(format!(
            "{} must be true or false, got '{}'",
            name, value
        ))),
    }
}
