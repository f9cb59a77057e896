use super::custom::{CustomDiff, FieldDiff};
use super::node::DiffNode;
use crate::core::{HistoryError, Result};
use chrono::DateTime;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Recursion cap for pathologically deep documents. Values at this depth
/// are compared as whole units instead of being descended into; the input
/// trees themselves are assumed acyclic (serde_json values always are).
pub const MAX_DIFF_DEPTH: usize = 64;

/// Compare two document trees and produce a minimal structural delta.
///
/// Returns `Ok(None)` when the trees are equal. The optional `custom`
/// override is consulted per object key at every nesting level and may
/// suppress a field, force a replacement value, or abort the diff.
///
/// Scalars compare by value; strings that both parse as RFC 3339 datetimes
/// compare by instant, so equal moments in different offsets are not
/// reported as changes. Arrays are atomic: any inequality yields a single
/// whole-array replacement.
pub fn diff(before: &Value, after: &Value, custom: Option<&CustomDiff>) -> Result<Option<DiffNode>> {
    diff_value(before, after, custom, 0)
}

fn diff_value(
    before: &Value,
    after: &Value,
    custom: Option<&CustomDiff>,
    depth: usize,
) -> Result<Option<DiffNode>> {
    if depth >= MAX_DIFF_DEPTH {
        warn!(depth, "diff depth cap reached, falling back to whole-value replacement");
        return Ok(if values_equal(before, after) {
            None
        } else {
            Some(DiffNode::Value(after.clone()))
        });
    }

    match (before, after) {
        (Value::Object(before_obj), Value::Object(after_obj)) => {
            let mut delta = BTreeMap::new();

            let added_keys = after_obj.keys().filter(|key| !before_obj.contains_key(*key));
            for key in before_obj.keys().chain(added_keys) {
                let before_val = before_obj.get(key);
                let after_val = after_obj.get(key);

                let decision = match custom {
                    Some(algo) => algo.apply(key, before_val, after_val),
                    None => FieldDiff::Default,
                };

                match decision {
                    FieldDiff::Suppress => continue,
                    FieldDiff::Replace(value) => {
                        delta.insert(key.clone(), DiffNode::Value(value));
                    }
                    FieldDiff::Fail(message) => {
                        return Err(HistoryError::Diff(format!(
                            "custom algorithm rejected field '{key}': {message}"
                        )));
                    }
                    FieldDiff::Default => match (before_val, after_val) {
                        (Some(b), Some(a)) => {
                            if let Some(node) = diff_value(b, a, custom, depth + 1)? {
                                delta.insert(key.clone(), node);
                            }
                        }
                        (None, Some(a)) => {
                            delta.insert(key.clone(), DiffNode::Value(a.clone()));
                        }
                        (Some(_), None) => {
                            delta.insert(key.clone(), DiffNode::Removed);
                        }
                        (None, None) => {}
                    },
                }
            }

            Ok(if delta.is_empty() { None } else { Some(DiffNode::Object(delta)) })
        }
        _ => Ok(if values_equal(before, after) {
            None
        } else {
            Some(DiffNode::Value(after.clone()))
        }),
    }
}

/// Value equality with date-instant awareness: two strings that both parse
/// as RFC 3339 datetimes are equal when they denote the same instant.
fn values_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    if let (Value::String(x), Value::String(y)) = (a, b) {
        if let (Ok(dx), Ok(dy)) = (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
            return dx == dy;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn diff_plain(before: &Value, after: &Value) -> Option<DiffNode> {
        diff(before, after, None).unwrap()
    }

    #[test]
    fn equal_inputs_produce_no_change() {
        let doc = json!({"name": "A", "tags": [1, 2], "nested": {"x": true}});
        assert_eq!(diff_plain(&doc, &doc), None);
        assert_eq!(diff_plain(&json!(42), &json!(42)), None);
        assert_eq!(diff_plain(&json!(null), &json!(null)), None);
    }

    #[test]
    fn scalar_change_is_replacement() {
        let node = diff_plain(&json!("A"), &json!("B")).unwrap();
        assert_eq!(node, DiffNode::Value(json!("B")));
    }

    #[test]
    fn changed_key_recurses_unchanged_key_omitted() {
        let before = json!({"name": "A", "age": 30});
        let after = json!({"name": "B", "age": 30});

        let node = diff_plain(&before, &after).unwrap();
        assert_eq!(node.get("name"), Some(&DiffNode::Value(json!("B"))));
        assert!(node.get("age").is_none());
        assert_eq!(node.len(), 1);
    }

    #[test]
    fn disjoint_keys_appear_as_additions_and_removals() {
        let before = json!({"a": 1, "shared": true});
        let after = json!({"b": 2, "shared": true});

        let node = diff_plain(&before, &after).unwrap();
        assert_eq!(node.get("a"), Some(&DiffNode::Removed));
        assert_eq!(node.get("b"), Some(&DiffNode::Value(json!(2))));
        assert!(node.get("shared").is_none());
    }

    #[test]
    fn nested_object_change_produces_nested_delta() {
        let before = json!({"address": {"city": "Kyiv", "zip": "01001"}});
        let after = json!({"address": {"city": "Lviv", "zip": "01001"}});

        let node = diff_plain(&before, &after).unwrap();
        let address = node.get("address").unwrap();
        assert_eq!(address.get("city"), Some(&DiffNode::Value(json!("Lviv"))));
        assert!(address.get("zip").is_none());
    }

    #[test]
    fn array_change_is_atomic_replacement() {
        let before = json!({"tags": [1, 2, 3]});
        let after = json!({"tags": [1, 2, 3, 4]});

        let node = diff_plain(&before, &after).unwrap();
        assert_eq!(node.get("tags"), Some(&DiffNode::Value(json!([1, 2, 3, 4]))));
    }

    #[test]
    fn equal_arrays_are_omitted() {
        let before = json!({"tags": [1, 2, 3], "n": 1});
        let after = json!({"tags": [1, 2, 3], "n": 2});

        let node = diff_plain(&before, &after).unwrap();
        assert!(node.get("tags").is_none());
        assert_eq!(node.get("n"), Some(&DiffNode::Value(json!(2))));
    }

    #[test]
    fn rfc3339_strings_compare_by_instant() {
        let before = json!({"at": "2024-05-01T12:00:00Z"});
        let after = json!({"at": "2024-05-01T14:00:00+02:00"});
        assert_eq!(diff_plain(&before, &after), None);

        let later = json!({"at": "2024-05-01T15:00:00Z"});
        let node = diff_plain(&before, &later).unwrap();
        assert_eq!(node.get("at"), Some(&DiffNode::Value(json!("2024-05-01T15:00:00Z"))));
    }

    #[test]
    fn null_to_value_is_a_change() {
        let node = diff_plain(&json!({"v": null}), &json!({"v": 100})).unwrap();
        assert_eq!(node.get("v"), Some(&DiffNode::Value(json!(100))));
    }

    #[test]
    fn suppressed_key_never_appears() {
        let custom = CustomDiff::suppress_keys(["updatedAt"]);
        let before = json!({
            "name": "A",
            "age": 30,
            "updatedAt": "2024-01-01T00:00:00Z",
            "nested": {"updatedAt": "2024-01-01T00:00:00Z", "x": 1}
        });
        let after = json!({
            "name": "B",
            "age": 30,
            "updatedAt": "2024-02-02T00:00:00Z",
            "nested": {"updatedAt": "2024-03-03T00:00:00Z", "x": 2}
        });

        let node = diff(&before, &after, Some(&custom)).unwrap().unwrap();
        assert!(!node.mentions_key("updatedAt"));
        assert_eq!(node.get("name"), Some(&DiffNode::Value(json!("B"))));
        assert_eq!(node.get("nested").unwrap().get("x"), Some(&DiffNode::Value(json!(2))));
    }

    #[test]
    fn suppression_of_only_change_yields_no_change() {
        let custom = CustomDiff::suppress_keys(["updatedAt"]);
        let before = json!({"name": "A", "updatedAt": "2024-01-01T00:00:00Z"});
        let after = json!({"name": "A", "updatedAt": "2024-02-02T00:00:00Z"});

        assert_eq!(diff(&before, &after, Some(&custom)).unwrap(), None);
    }

    #[test]
    fn custom_replacement_overrides_default() {
        let custom = CustomDiff::new(|key, _b, _a| {
            if key == "secret" {
                FieldDiff::Replace(json!("[redacted]"))
            } else {
                FieldDiff::Default
            }
        });
        let before = json!({"secret": "old"});
        let after = json!({"secret": "new"});

        let node = diff(&before, &after, Some(&custom)).unwrap().unwrap();
        assert_eq!(node.get("secret"), Some(&DiffNode::Value(json!("[redacted]"))));
    }

    #[test]
    fn custom_fail_aborts_the_diff() {
        let custom = CustomDiff::new(|key, _b, _a| {
            if key == "broken" {
                FieldDiff::Fail("cannot compare".to_string())
            } else {
                FieldDiff::Default
            }
        });
        let err = diff(&json!({"broken": 1}), &json!({"broken": 2}), Some(&custom)).unwrap_err();
        assert!(matches!(err, HistoryError::Diff(_)));
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn depth_cap_falls_back_to_replacement() {
        fn nest(depth: usize, leaf: Value) -> Value {
            let mut value = leaf;
            for _ in 0..depth {
                value = json!({"inner": value});
            }
            value
        }

        let before = nest(MAX_DIFF_DEPTH + 4, json!(1));
        let after = nest(MAX_DIFF_DEPTH + 4, json!(2));

        // Still reports a change, just not field-precise at the cap.
        assert!(diff_plain(&before, &after).is_some());

        let same = nest(MAX_DIFF_DEPTH + 4, json!(1));
        assert_eq!(diff_plain(&before, &same), None);
    }

    #[test]
    fn identical_inputs_always_produce_identical_trees() {
        let before = json!({"z": 1, "a": {"m": [1, 2]}, "k": "x"});
        let after = json!({"z": 2, "a": {"m": [2, 1]}, "k": "y"});

        let first = diff_plain(&before, &after).unwrap();
        let second = diff_plain(&before, &after).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
