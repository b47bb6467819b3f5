//! Server-side result transformations.
//!
//! A transformation rewrites a device result before it reaches the client.
//! Results opt in by carrying `_domain`/`_method` routing metadata; the
//! registry is looked up by domain, then method.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::identifiers::{RequestId, SessionId};

// ============================================================================
// Types
// ============================================================================

/// Transformation callback: `(result, context) -> new result`.
pub type Transform = Box<dyn Fn(Value, &RequestContext) -> Value + Send + Sync>;

/// Context handed to a transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Session the result belongs to.
    pub session_id: SessionId,
    /// ID of the request being answered, if any.
    pub request_id: Option<RequestId>,
    /// Domains enabled at the time of the call, in enable order.
    pub enabled_domains: Vec<String>,
}

// ============================================================================
// TransformRegistry
// ============================================================================

/// Lookup of transformations keyed by domain then method.
pub trait TransformRegistry: Send + Sync {
    /// Returns the transformation for `(domain, method)`, if registered.
    fn lookup(&self, domain: &str, method: &str) -> Option<&Transform>;
}

// ============================================================================
// MiddlewareRegistry
// ============================================================================

/// Two-level map implementation of [`TransformRegistry`].
///
/// # Example
///
/// ```
/// use devtools_bridge::bridge::{MiddlewareRegistry, TransformRegistry};
/// use serde_json::json;
///
/// let mut registry = MiddlewareRegistry::new();
/// registry.register("Page", "getResourceTree", |result, _ctx| json!({ "frameTree": result }));
///
/// assert!(registry.lookup("Page", "getResourceTree").is_some());
/// assert!(registry.lookup("Page", "reload").is_none());
/// ```
#[derive(Default)]
pub struct MiddlewareRegistry {
    handlers: FxHashMap<String, FxHashMap<String, Transform>>,
}

impl MiddlewareRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a transformation, replacing any previous one for the pair.
    pub fn register<F>(&mut self, domain: impl Into<String>, method: impl Into<String>, transform: F)
    where
        F: Fn(Value, &RequestContext) -> Value + Send + Sync + 'static,
    {
        self.handlers
            .entry(domain.into())
            .or_default()
            .insert(method.into(), Box::new(transform));
    }

    /// Number of registered transformations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.values().map(FxHashMap::len).sum()
    }

    /// Returns `true` if nothing is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TransformRegistry for MiddlewareRegistry {
    fn lookup(&self, domain: &str, method: &str) -> Option<&Transform> {
        self.handlers.get(domain)?.get(method)
    }
}

impl std::fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareRegistry")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> RequestContext {
        RequestContext {
            session_id: SessionId::new("s1").expect("valid session id"),
            request_id: Some(RequestId::new(9)),
            enabled_domains: vec!["Page".into()],
        }
    }

    #[test]
    fn test_lookup_two_levels() {
        let mut registry = MiddlewareRegistry::new();
        registry.register("Page", "getTree", |_, _| json!(1));
        registry.register("Page", "getFrame", |_, _| json!(2));
        registry.register("DOM", "getDocument", |_, _| json!(3));

        assert_eq!(registry.len(), 3);
        assert!(registry.lookup("Page", "getTree").is_some());
        assert!(registry.lookup("DOM", "getTree").is_none());
        assert!(registry.lookup("Network", "getTree").is_none());
    }

    #[test]
    fn test_transform_receives_context() {
        let mut registry = MiddlewareRegistry::new();
        registry.register("Page", "getTree", |result, ctx| {
            json!({ "wrapped": result, "id": ctx.request_id, "session": ctx.session_id.as_str() })
        });

        let transform = registry.lookup("Page", "getTree").expect("registered");
        let output = transform(json!({"a": 1}), &context());
        assert_eq!(output, json!({"wrapped": {"a": 1}, "id": 9, "session": "s1"}));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = MiddlewareRegistry::new();
        registry.register("Page", "getTree", |_, _| json!("old"));
        registry.register("Page", "getTree", |_, _| json!("new"));

        assert_eq!(registry.len(), 1);
        let transform = registry.lookup("Page", "getTree").expect("registered");
        assert_eq!(transform(Value::Null, &context()), json!("new"));
    }

    #[test]
    fn test_empty_registry() {
        let registry = MiddlewareRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.lookup("Page", "getTree").is_none());
    }
}
