//! Request-scoped context carrying the authenticated identity.
//!
//! A [`RequestContext`] is immutable. Attaching a value returns a derived
//! context and leaves the original untouched, so one context can be handed
//! to several consumers at once.
//!
//! The identity is stored under a private newtype key. Code outside this
//! module cannot name that type, so it can neither overwrite nor spoof the
//! identity through [`RequestContext::with_value`].

use crate::auth::identity::Identity;
use axum::extract::FromRequestParts;
use http::request::Parts;
use http::Extensions;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

/// Storage key for the verified identity.
#[derive(Clone)]
struct AuthenticatedIdentity(Identity);

/// Immutable, cheaply cloneable per-request value container.
#[derive(Clone, Default)]
pub struct RequestContext {
    values: Arc<Extensions>,
}

impl RequestContext {
    /// An empty (anonymous) context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a context carrying `identity`.
    #[must_use]
    pub fn with_identity(&self, identity: Identity) -> Self {
        self.derive(AuthenticatedIdentity(identity))
    }

    /// The verified identity, if the request was authenticated.
    pub fn identity(&self) -> Option<&Identity> {
        self.values
            .get::<AuthenticatedIdentity>()
            .map(|AuthenticatedIdentity(identity)| identity)
    }

    /// Derive a context carrying an arbitrary typed value.
    ///
    /// Values are keyed by type; a later value of the same type replaces
    /// the earlier one in the derived context only.
    #[must_use]
    pub fn with_value<T>(&self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.derive(value)
    }

    pub fn value<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.values.get::<T>()
    }

    fn derive<T>(&self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut values = Extensions::clone(&self.values);
        values.insert(value);
        Self {
            values: Arc::new(values),
        }
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("identity", &self.identity())
            .field("values", &self.values.len())
            .finish()
    }
}

/// Extracts the context stored by the auth middleware, or an empty one.
#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default())
    }
}
