//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use statebridge_core::StoreKey;

/// Generate a JSON scalar.
pub fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-z ]{0,8}".prop_map(Value::String),
    ]
}

/// Generate an arbitrary JSON value, nested a few levels deep.
///
/// Object keys are drawn from a small alphabet (including the characters
/// that need escaping in pointers) so that successive values share paths.
pub fn json_value() -> impl Strategy<Value = Value> {
    json_leaf().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map(object_key(), inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Generate a store state: always a JSON object at the root.
pub fn json_state() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(object_key(), json_value(), 0..6)
        .prop_map(|m| Value::Object(m.into_iter().collect::<Map<String, Value>>()))
}

/// Generate a sequence of states a store might move through.
pub fn state_history(max_len: usize) -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(json_state(), 1..=max_len)
}

/// Generate a valid store key.
pub fn store_key() -> impl Strategy<Value = StoreKey> {
    "[a-z][a-z0-9_]{0,11}".prop_filter_map("valid key", |s| StoreKey::new(s).ok())
}

/// A todo-list state with `n` entries, large enough that small edits go
/// out as patches.
pub fn todo_state(n: usize) -> Value {
    let todos: Vec<Value> = (0..n)
        .map(|i| json!({ "id": i, "title": format!("todo number {i}"), "done": false }))
        .collect();
    json!({ "filter": "all", "todos": todos })
}

fn object_key() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-d]{1,2}",
        Just("a/b".to_string()),
        Just("m~n".to_string()),
        Just(String::new()),
    ]
}
