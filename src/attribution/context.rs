use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Ambient per-operation context the attribution resolver reads from.
///
/// Implemented by whatever carries request-scoped state in the host
/// application (a task-local map, a middleware-populated registry, a
/// session object). The contract is a single keyed lookup scoped to the
/// current logical operation.
pub trait AmbientContext: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
}

/// Plain shared-map context, sufficient for applications that set the
/// acting principal once per operation, and for tests.
#[derive(Default, Clone)]
pub struct MapContext {
    values: Arc<RwLock<HashMap<String, Value>>>,
}

impl MapContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.into(), value);
        }
    }

    pub fn remove(&self, key: &str) {
        if let Ok(mut values) = self.values.write() {
            values.remove(key);
        }
    }
}

impl AmbientContext for MapContext {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().ok().and_then(|values| values.get(key).cloned())
    }
}
