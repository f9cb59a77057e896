use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One node of a structural delta between two document trees.
///
/// Absence of a key in an `Object` node means "no change" for that field,
/// never "null". A `BTreeMap` keeps serialization order deterministic
/// regardless of the key iteration order of the inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiffNode {
    /// The field was added or its value replaced; holds the after value.
    Value(Value),

    /// The field was present before and is absent after.
    Removed,

    /// Nested delta for an object-shaped field, keyed by child field name.
    Object(BTreeMap<String, DiffNode>),
}

impl DiffNode {
    /// True for an `Object` node with no entries.
    pub fn is_empty(&self) -> bool {
        matches!(self, DiffNode::Object(entries) if entries.is_empty())
    }

    /// Child delta for `key`, when this node is object-shaped.
    pub fn get(&self, key: &str) -> Option<&DiffNode> {
        match self {
            DiffNode::Object(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Whether `key` appears anywhere in this delta tree, at any depth.
    pub fn mentions_key(&self, key: &str) -> bool {
        match self {
            DiffNode::Object(entries) => {
                entries.contains_key(key) || entries.values().any(|node| node.mentions_key(key))
            }
            _ => false,
        }
    }

    /// Number of direct entries in an object-shaped node, 0 otherwise.
    pub fn len(&self) -> usize {
        match self {
            DiffNode::Object(entries) => entries.len(),
            _ => 0,
        }
    }
}

impl From<Value> for DiffNode {
    fn from(value: Value) -> Self {
        DiffNode::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mentions_key_searches_nested_levels() {
        let mut inner = BTreeMap::new();
        inner.insert("city".to_string(), DiffNode::Value(json!("Kyiv")));
        let mut outer = BTreeMap::new();
        outer.insert("address".to_string(), DiffNode::Object(inner));
        let node = DiffNode::Object(outer);

        assert!(node.mentions_key("address"));
        assert!(node.mentions_key("city"));
        assert!(!node.mentions_key("zip"));
    }

    #[test]
    fn empty_object_node_is_empty() {
        assert!(DiffNode::Object(BTreeMap::new()).is_empty());
        assert!(!DiffNode::Value(json!(1)).is_empty());
        assert!(!DiffNode::Removed.is_empty());
    }

    #[test]
    fn serialization_is_deterministic() {
        let mut entries = BTreeMap::new();
        entries.insert("b".to_string(), DiffNode::Value(json!(2)));
        entries.insert("a".to_string(), DiffNode::Removed);
        let node = DiffNode::Object(entries);

        let first = serde_json::to_string(&node).unwrap();
        let second = serde_json::to_string(&node).unwrap();
        assert_eq!(first, second);

        let parsed: DiffNode = serde_json::from_str(&first).unwrap();
        assert_eq!(parsed, node);
    }
}
