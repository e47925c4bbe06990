//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions over JSON response bodies.

use serde_json::Value;

/// Body every authentication failure renders.
pub const INVALID_TOKEN_CODE: &str = "INVALID_TOKEN";

/// Custom assertions for API response bodies
///
/// # Example
/// ```rust,ignore
/// body.assert_greets("alice@example.com");
/// other.assert_invalid_token();
/// ```
pub trait ResponseAssertions {
    /// Assert the body is the generic 401 error.
    fn assert_invalid_token(&self) -> &Self;

    /// Assert a successful `hello` greeting addressed to `name`.
    fn assert_greets(&self, name: &str) -> &Self;

    /// Assert a GraphQL error whose message contains `fragment`.
    fn assert_graphql_error(&self, fragment: &str) -> &Self;
}

impl ResponseAssertions for Value {
    fn assert_invalid_token(&self) -> &Self {
        assert_eq!(
            self["error"]["code"], INVALID_TOKEN_CODE,
            "Expected INVALID_TOKEN error body, got {self}"
        );
        assert_eq!(
            self["error"]["message"], "The access token is invalid or expired",
            "Auth failures must share one message, got {self}"
        );
        self
    }

    fn assert_greets(&self, name: &str) -> &Self {
        assert!(
            self.get("errors").is_none(),
            "Expected no GraphQL errors, got {self}"
        );
        assert_eq!(
            self["data"]["hello"]["message"],
            format!("Hello World! How are you doing, {name}?"),
            "Unexpected greeting in {self}"
        );
        self
    }

    fn assert_graphql_error(&self, fragment: &str) -> &Self {
        let errors = self["errors"]
            .as_array()
            .unwrap_or_else(|| panic!("Expected an errors array, got {self}"));
        assert!(
            errors.iter().any(|e| e["message"]
                .as_str()
                .is_some_and(|m| m.contains(fragment))),
            "No GraphQL error containing '{fragment}' in {self}"
        );
        self
    }
}
