//! Structural diff and patch over JSON snapshots.
//!
//! [`diff`] produces an ordered sequence of `add`/`remove`/`replace`
//! operations (RFC 6902 subset) turning one snapshot into another, and
//! [`apply_patch`] replays them. Together they satisfy the round-trip law:
//!
//! ```text
//! apply_patch(a, diff(a, b)) == b
//! ```
//!
//! Objects are compared member by member, arrays index by index. Surplus
//! array elements are appended in ascending order or removed in descending
//! order so every index stays valid while the patch is replayed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PatchError;
use crate::pointer;

/// A single structural patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    /// Insert a member or array element.
    Add { path: String, value: Value },
    /// Delete an existing member or array element.
    Remove { path: String },
    /// Overwrite an existing location.
    Replace { path: String, value: Value },
}

impl PatchOp {
    /// The pointer this operation targets.
    pub fn path(&self) -> &str {
        match self {
            PatchOp::Add { path, .. } | PatchOp::Remove { path } | PatchOp::Replace { path, .. } => {
                path
            }
        }
    }
}

/// An ordered list of patch operations.
pub type PatchSet = Vec<PatchOp>;

/// Compute the patch transforming `previous` into `next`.
///
/// Returns an empty set when the two snapshots are equal.
pub fn diff(previous: &Value, next: &Value) -> PatchSet {
    let mut ops = Vec::new();
    diff_at(&mut ops, String::new(), previous, next);
    ops
}

fn diff_at(ops: &mut PatchSet, path: String, previous: &Value, next: &Value) {
    if previous == next {
        return;
    }

    match (previous, next) {
        (Value::Object(old), Value::Object(new)) => diff_objects(ops, &path, old, new),
        (Value::Array(old), Value::Array(new)) => diff_arrays(ops, &path, old, new),
        _ => ops.push(PatchOp::Replace {
            path,
            value: next.clone(),
        }),
    }
}

fn diff_objects(ops: &mut PatchSet, path: &str, old: &Map<String, Value>, new: &Map<String, Value>) {
    for (key, old_value) in old {
        let child = pointer::push(path, key);
        match new.get(key) {
            Some(new_value) => diff_at(ops, child, old_value, new_value),
            None => ops.push(PatchOp::Remove { path: child }),
        }
    }

    for (key, new_value) in new {
        if !old.contains_key(key) {
            ops.push(PatchOp::Add {
                path: pointer::push(path, key),
                value: new_value.clone(),
            });
        }
    }
}

fn diff_arrays(ops: &mut PatchSet, path: &str, old: &[Value], new: &[Value]) {
    let common = old.len().min(new.len());

    for index in 0..common {
        diff_at(ops, pointer::push(path, &index.to_string()), &old[index], &new[index]);
    }

    if new.len() > old.len() {
        for (index, value) in new.iter().enumerate().skip(common) {
            ops.push(PatchOp::Add {
                path: pointer::push(path, &index.to_string()),
                value: value.clone(),
            });
        }
    } else {
        for index in (common..old.len()).rev() {
            ops.push(PatchOp::Remove {
                path: pointer::push(path, &index.to_string()),
            });
        }
    }
}

/// Apply a patch set to a snapshot, producing the next snapshot.
///
/// The input is never modified. Application is all-or-nothing: the first
/// operation that does not match the document aborts with an error and no
/// partially patched value escapes.
pub fn apply_patch(document: &Value, patches: &[PatchOp]) -> Result<Value, PatchError> {
    let mut target = document.clone();
    for op in patches {
        apply_op(&mut target, op)?;
    }
    Ok(target)
}

fn apply_op(document: &mut Value, op: &PatchOp) -> Result<(), PatchError> {
    let path = op.path();
    let mut tokens = pointer::parse(path)?;

    let Some(last) = tokens.pop() else {
        return match op {
            PatchOp::Add { value, .. } | PatchOp::Replace { value, .. } => {
                *document = value.clone();
                Ok(())
            }
            PatchOp::Remove { .. } => Err(PatchError::RemoveRoot),
        };
    };

    let parent = resolve_mut(document, &tokens, path)?;

    match parent {
        Value::Object(map) => match op {
            PatchOp::Add { value, .. } => {
                map.insert(last, value.clone());
                Ok(())
            }
            PatchOp::Replace { value, .. } => match map.get_mut(&last) {
                Some(slot) => {
                    *slot = value.clone();
                    Ok(())
                }
                None => Err(PatchError::PathNotFound(path.to_owned())),
            },
            PatchOp::Remove { .. } => map
                .remove(&last)
                .map(|_| ())
                .ok_or_else(|| PatchError::PathNotFound(path.to_owned())),
        },
        Value::Array(items) => {
            let len = items.len();
            match op {
                PatchOp::Add { value, .. } => {
                    let index = if last == "-" {
                        len
                    } else {
                        parse_index(&last, path)?
                    };
                    if index > len {
                        return Err(PatchError::IndexOutOfBounds {
                            path: path.to_owned(),
                            index,
                            len,
                        });
                    }
                    items.insert(index, value.clone());
                    Ok(())
                }
                PatchOp::Replace { value, .. } => {
                    let index = existing_index(&last, len, path)?;
                    items[index] = value.clone();
                    Ok(())
                }
                PatchOp::Remove { .. } => {
                    let index = existing_index(&last, len, path)?;
                    items.remove(index);
                    Ok(())
                }
            }
        }
        _ => Err(PatchError::PathNotFound(path.to_owned())),
    }
}

/// Walk `tokens` down from the root, returning the addressed container.
fn resolve_mut<'a>(
    mut current: &'a mut Value,
    tokens: &[String],
    path: &str,
) -> Result<&'a mut Value, PatchError> {
    for token in tokens {
        current = match current {
            Value::Object(map) => map
                .get_mut(token)
                .ok_or_else(|| PatchError::PathNotFound(path.to_owned()))?,
            Value::Array(items) => {
                let len = items.len();
                let index = existing_index(token, len, path)?;
                &mut items[index]
            }
            _ => return Err(PatchError::PathNotFound(path.to_owned())),
        };
    }
    Ok(current)
}

fn parse_index(token: &str, path: &str) -> Result<usize, PatchError> {
    // RFC 6901 forbids leading zeros; "0" itself is fine.
    let well_formed = !token.is_empty()
        && token.bytes().all(|b| b.is_ascii_digit())
        && !(token.len() > 1 && token.starts_with('0'));
    if !well_formed {
        return Err(PatchError::InvalidIndex {
            path: path.to_owned(),
            token: token.to_owned(),
        });
    }
    token.parse().map_err(|_| PatchError::InvalidIndex {
        path: path.to_owned(),
        token: token.to_owned(),
    })
}

fn existing_index(token: &str, len: usize, path: &str) -> Result<usize, PatchError> {
    let index = parse_index(token, path)?;
    if index >= len {
        return Err(PatchError::IndexOutOfBounds {
            path: path.to_owned(),
            index,
            len,
        });
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_diff_equal_is_empty() {
        let state = json!({ "count": 3, "items": [1, 2] });
        assert!(diff(&state, &state).is_empty());
    }

    #[test]
    fn test_diff_counter_replace() {
        let patches = diff(&json!({ "count": 0 }), &json!({ "count": 1 }));
        assert_eq!(
            patches,
            vec![PatchOp::Replace {
                path: "/count".into(),
                value: json!(1),
            }]
        );
        assert_eq!(
            serde_json::to_value(&patches).unwrap(),
            json!([{ "op": "replace", "path": "/count", "value": 1 }])
        );
    }

    #[test]
    fn test_diff_object_members() {
        let before = json!({ "a": 1, "b": 2 });
        let after = json!({ "b": 2, "c": 3 });
        let patches = diff(&before, &after);
        assert_eq!(
            patches,
            vec![
                PatchOp::Remove { path: "/a".into() },
                PatchOp::Add {
                    path: "/c".into(),
                    value: json!(3),
                },
            ]
        );
    }

    #[test]
    fn test_diff_array_shrink_removes_from_end() {
        let patches = diff(&json!([1, 2, 3, 4]), &json!([1, 2]));
        assert_eq!(
            patches,
            vec![
                PatchOp::Remove { path: "/3".into() },
                PatchOp::Remove { path: "/2".into() },
            ]
        );
        assert_eq!(apply_patch(&json!([1, 2, 3, 4]), &patches).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_diff_type_change_replaces() {
        let patches = diff(&json!({ "user": null }), &json!({ "user": { "id": 7 } }));
        assert_eq!(
            patches,
            vec![PatchOp::Replace {
                path: "/user".into(),
                value: json!({ "id": 7 }),
            }]
        );
    }

    #[test]
    fn test_diff_root_replace() {
        let patches = diff(&json!(1), &json!("one"));
        assert_eq!(
            patches,
            vec![PatchOp::Replace {
                path: String::new(),
                value: json!("one"),
            }]
        );
        assert_eq!(apply_patch(&json!(1), &patches).unwrap(), json!("one"));
    }

    #[test]
    fn test_apply_does_not_touch_input() {
        let before = json!({ "count": 1 });
        let patches = vec![PatchOp::Replace {
            path: "/count".into(),
            value: json!(2),
        }];
        let after = apply_patch(&before, &patches).unwrap();
        assert_eq!(before, json!({ "count": 1 }));
        assert_eq!(after, json!({ "count": 2 }));
    }

    #[test]
    fn test_apply_replace_missing_member_fails() {
        let patches = vec![PatchOp::Replace {
            path: "/missing".into(),
            value: json!(true),
        }];
        assert_eq!(
            apply_patch(&json!({ "count": 1 }), &patches),
            Err(PatchError::PathNotFound("/missing".into()))
        );
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let patches = vec![
            PatchOp::Replace {
                path: "/count".into(),
                value: json!(2),
            },
            PatchOp::Remove {
                path: "/nested/deep".into(),
            },
        ];
        assert!(apply_patch(&json!({ "count": 1 }), &patches).is_err());
    }

    #[test]
    fn test_apply_array_append_dash() {
        let patches = vec![PatchOp::Add {
            path: "/-".into(),
            value: json!(3),
        }];
        assert_eq!(apply_patch(&json!([1, 2]), &patches).unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn test_apply_bad_index() {
        let patches = vec![PatchOp::Remove { path: "/01".into() }];
        assert!(matches!(
            apply_patch(&json!([1, 2]), &patches),
            Err(PatchError::InvalidIndex { .. })
        ));

        let patches = vec![PatchOp::Remove { path: "/5".into() }];
        assert!(matches!(
            apply_patch(&json!([1, 2]), &patches),
            Err(PatchError::IndexOutOfBounds { index: 5, len: 2, .. })
        ));
    }

    #[test]
    fn test_apply_remove_root_fails() {
        let patches = vec![PatchOp::Remove { path: String::new() }];
        assert_eq!(apply_patch(&json!({}), &patches), Err(PatchError::RemoveRoot));
    }

    #[test]
    fn test_apply_through_scalar_fails() {
        let patches = vec![PatchOp::Add {
            path: "/count/inner".into(),
            value: json!(1),
        }];
        assert!(matches!(
            apply_patch(&json!({ "count": 1 }), &patches),
            Err(PatchError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_keys_with_separators_roundtrip() {
        let before = json!({ "a/b": 1, "c~d": { "e": 1 } });
        let after = json!({ "a/b": 2, "c~d": { "e": 2 } });
        let patches = diff(&before, &after);
        assert_eq!(patches[0].path(), "/a~1b");
        assert_eq!(apply_patch(&before, &patches).unwrap(), after);
    }

    fn json_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-z~/]{0,6}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z~/]{0,4}", inner, 0..6)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_round_trip(a in json_value(), b in json_value()) {
            let patches = diff(&a, &b);
            prop_assert_eq!(apply_patch(&a, &patches).unwrap(), b);
        }

        #[test]
        fn prop_self_diff_is_empty(a in json_value()) {
            prop_assert!(diff(&a, &a).is_empty());
        }
    }
}
