//! Recipe application for host-initiated mutations.

use serde_json::Value;

/// Apply `recipe` to a structural copy of `state` and return the result.
///
/// The recipe may edit its draft freely; `state` itself is never touched,
/// so no aliasing survives past the call.
///
/// ```rust
/// use serde_json::json;
/// use statebridge_core::produce;
///
/// let state = json!({ "count": 0 });
/// let next = produce(&state, |draft| draft["count"] = json!(5));
/// assert_eq!(next, json!({ "count": 5 }));
/// assert_eq!(state, json!({ "count": 0 }));
/// ```
pub fn produce<F>(state: &Value, recipe: F) -> Value
where
    F: FnOnce(&mut Value),
{
    let mut draft = state.clone();
    recipe(&mut draft);
    draft
}
