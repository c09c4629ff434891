//! Store trait: the per-key contract consumed by UI bindings.

use std::sync::Arc;

use serde_json::Value;
use statebridge_core::StoreKey;

use crate::subscription::Subscription;

/// A subscriber callback, invoked with the snapshot after each transition.
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// A pure `(state, event) -> state` transition bound to a host key.
pub type Reducer = Arc<dyn Fn(&Value, &Value) -> Value + Send + Sync>;

/// Wrap a closure as a [`Listener`].
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&Value) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a [`Reducer`].
pub fn reducer<F>(f: F) -> Reducer
where
    F: Fn(&Value, &Value) -> Value + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The store contract: one key's state and its subscribers.
///
/// Implemented by the authoritative host store and by mirror stores.
/// None of these operations fail past the call: problems are logged and
/// the state is left untouched.
pub trait Store: Send + Sync {
    /// The key naming this store.
    fn key(&self) -> &StoreKey;

    /// The current snapshot.
    fn get_state(&self) -> Value;

    /// Request a state transition.
    ///
    /// On the host this runs the bound reducer; on a mirror it forwards
    /// the event to the host and leaves local state alone.
    fn dispatch(&self, event: Value);

    /// Register a listener.
    ///
    /// The listener is invoked once immediately with the current snapshot,
    /// then after every subsequent transition.
    fn subscribe(&self, listener: Listener) -> Subscription;
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// Subscribe with a plain closure.
    fn on_change<F>(&self, f: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(listener(f))
    }

    /// Deserialize the current snapshot into a typed view.
    fn state_as<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.get_state()).ok()
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

/// Receiver of authoritative transitions (the transport fan-out).
pub trait StateSink: Send + Sync {
    /// Called after `key` moved to `state`.
    fn publish(&self, key: &StoreKey, state: &Value);
}
