use super::context::AmbientContext;
use crate::core::Result;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Resolves the acting principal for a change from ambient context, with a
/// last-known-value fallback.
///
/// Some lifecycle events (update expressions in particular) run without
/// access to the context-bearing call that identified the principal, so a
/// successful lookup is cached and reused when a later live lookup comes
/// up empty. Known imprecision: if operations from two principals
/// interleave without an intervening context-bearing read, the cached
/// value may attribute a change to the wrong principal.
pub struct AttributionResolver {
    context: Arc<dyn AmbientContext>,
    context_key: String,
    last_known: RwLock<Option<String>>,
}

impl AttributionResolver {
    pub fn new(context: Arc<dyn AmbientContext>, context_key: impl Into<String>) -> Self {
        Self {
            context,
            context_key: context_key.into(),
            last_known: RwLock::new(None),
        }
    }

    /// Refresh the fallback cache from ambient context, keeping the old
    /// value when the context has nothing. Called on context-bearing reads
    /// (document loads) ahead of record-save paths.
    pub fn prime(&self) -> Result<()> {
        if let Some(principal) = self.lookup() {
            debug!(principal = %principal, "attribution cache primed");
            *self.last_known.write()? = Some(principal);
        }
        Ok(())
    }

    /// Principal for the current operation: live context first, cached
    /// fallback second. Absence is a valid, silent state.
    pub fn resolve(&self) -> Result<Option<String>> {
        if let Some(principal) = self.lookup() {
            *self.last_known.write()? = Some(principal.clone());
            return Ok(Some(principal));
        }
        Ok(self.last_known.read()?.clone())
    }

    fn lookup(&self) -> Option<String> {
        self.context.get(&self.context_key).map(|value| match value {
            Value::String(principal) => principal,
            other => other.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::MapContext;
    use serde_json::json;

    #[test]
    fn resolves_from_live_context() {
        let ctx = MapContext::new();
        ctx.set("request:user", json!("user1"));
        let resolver = AttributionResolver::new(Arc::new(ctx), "request:user");

        assert_eq!(resolver.resolve().unwrap(), Some("user1".to_string()));
    }

    #[test]
    fn absent_context_without_cache_is_silent_none() {
        let resolver = AttributionResolver::new(Arc::new(MapContext::new()), "request:user");
        assert_eq!(resolver.resolve().unwrap(), None);
    }

    #[test]
    fn falls_back_to_cached_value_when_context_cleared() {
        let ctx = MapContext::new();
        ctx.set("request:user", json!("user42"));
        let resolver = AttributionResolver::new(Arc::new(ctx.clone()), "request:user");

        resolver.prime().unwrap();
        ctx.remove("request:user");

        assert_eq!(resolver.resolve().unwrap(), Some("user42".to_string()));
    }

    #[test]
    fn live_lookup_refreshes_the_cache() {
        let ctx = MapContext::new();
        ctx.set("request:user", json!("first"));
        let resolver = AttributionResolver::new(Arc::new(ctx.clone()), "request:user");
        resolver.resolve().unwrap();

        ctx.set("request:user", json!("second"));
        resolver.resolve().unwrap();
        ctx.remove("request:user");

        assert_eq!(resolver.resolve().unwrap(), Some("second".to_string()));
    }

    #[test]
    fn prime_keeps_old_value_when_context_empty() {
        let ctx = MapContext::new();
        ctx.set("request:user", json!("user1"));
        let resolver = AttributionResolver::new(Arc::new(ctx.clone()), "request:user");
        resolver.prime().unwrap();

        ctx.remove("request:user");
        resolver.prime().unwrap();

        assert_eq!(resolver.resolve().unwrap(), Some("user1".to_string()));
    }

    #[test]
    fn non_string_principals_are_stringified() {
        let ctx = MapContext::new();
        ctx.set("request:user", json!(1207));
        let resolver = AttributionResolver::new(Arc::new(ctx), "request:user");

        assert_eq!(resolver.resolve().unwrap(), Some("1207".to_string()));
    }
}
