use super::{HistoryRecord, Operation, Payload};
use crate::core::{HistoryError, Result};
use crate::diff::{CustomDiff, DiffNode, diff};
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Build a snapshot payload from a full document, dropping excluded fields
/// (internal version counters and the like).
pub fn snapshot_payload(doc: &Value, exclude_fields: &[String]) -> Result<Payload> {
    let fields = doc
        .as_object()
        .ok_or_else(|| HistoryError::Unsupported("tracked documents must be JSON objects".to_string()))?;

    let mut snapshot = Map::new();
    for (key, value) in fields {
        if exclude_fields.iter().any(|excluded| excluded == key) {
            continue;
        }
        snapshot.insert(key.clone(), value.clone());
    }
    Ok(Payload::Snapshot(snapshot))
}

/// Build a diff payload for an update of an existing document.
///
/// The identifier field is always carried into the delta so consumers can
/// correlate the record with its document, even when nothing else changed.
pub fn diff_payload(
    original: &Value,
    doc: &Value,
    id_field: &str,
    exclude_fields: &[String],
    custom: Option<&CustomDiff>,
) -> Result<Payload> {
    if !original.is_object() || !doc.is_object() {
        return Err(HistoryError::Unsupported(
            "tracked documents must be JSON objects".to_string(),
        ));
    }

    // Object inputs always produce object deltas (or no change at all).
    let mut delta = match diff(original, doc, custom)? {
        Some(DiffNode::Object(entries)) => entries,
        Some(_) | None => BTreeMap::new(),
    };

    for excluded in exclude_fields {
        delta.remove(excluded);
    }

    if let Some(id) = doc.get(id_field) {
        delta.insert(id_field.to_string(), DiffNode::Value(id.clone()));
    }

    Ok(Payload::Diff(DiffNode::Object(delta)))
}

/// Assemble the final immutable record: timestamp stamped here, exactly one
/// record per triggering lifecycle event.
pub fn build(
    operation: Operation,
    payload: Payload,
    modified_by: Option<String>,
    metadata: Map<String, Value>,
) -> HistoryRecord {
    HistoryRecord {
        id: Uuid::new_v4(),
        timestamp: Utc::now(),
        operation,
        payload,
        modified_by,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_strips_excluded_fields() {
        let doc = json!({"_id": "1", "name": "A", "__v": 3});
        let payload = snapshot_payload(&doc, &["__v".to_string()]).unwrap();
        let fields = payload.as_snapshot().unwrap();
        assert_eq!(fields.get("name"), Some(&json!("A")));
        assert!(!fields.contains_key("__v"));
    }

    #[test]
    fn snapshot_rejects_non_object_documents() {
        let err = snapshot_payload(&json!([1, 2]), &[]).unwrap_err();
        assert!(matches!(err, HistoryError::Unsupported(_)));
    }

    #[test]
    fn diff_payload_carries_the_id_field() {
        let original = json!({"_id": "abc", "name": "A"});
        let doc = json!({"_id": "abc", "name": "B"});

        let payload = diff_payload(&original, &doc, "_id", &[], None).unwrap();
        let node = payload.as_diff().unwrap();
        assert_eq!(node.get("_id"), Some(&DiffNode::Value(json!("abc"))));
        assert_eq!(node.get("name"), Some(&DiffNode::Value(json!("B"))));
    }

    #[test]
    fn no_change_update_still_yields_id_only_delta() {
        let doc = json!({"_id": "abc", "name": "A"});
        let payload = diff_payload(&doc, &doc, "_id", &[], None).unwrap();
        let node = payload.as_diff().unwrap();
        assert_eq!(node.len(), 1);
        assert_eq!(node.get("_id"), Some(&DiffNode::Value(json!("abc"))));
    }

    #[test]
    fn diff_payload_keys_are_subset_of_after_keys_plus_id() {
        let original = json!({"_id": "abc", "name": "A", "age": 30});
        let doc = json!({"_id": "abc", "name": "B", "age": 30});

        let payload = diff_payload(&original, &doc, "_id", &[], None).unwrap();
        let node = payload.as_diff().unwrap();
        let after_keys = ["_id", "name", "age"];
        if let DiffNode::Object(entries) = node {
            for key in entries.keys() {
                assert!(after_keys.contains(&key.as_str()));
            }
        } else {
            unreachable!("diff payloads are object deltas");
        }
    }

    #[test]
    fn excluded_fields_dropped_from_delta() {
        let original = json!({"_id": "abc", "name": "A", "__v": 1});
        let doc = json!({"_id": "abc", "name": "B", "__v": 2});

        let payload = diff_payload(&original, &doc, "_id", &["__v".to_string()], None).unwrap();
        assert!(!payload.as_diff().unwrap().mentions_key("__v"));
    }
}
