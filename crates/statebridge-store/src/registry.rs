//! Host store registry: the authoritative keyed state.
//!
//! Exactly one snapshot per key lives here. Every transition, whether
//! through a reducer (`dispatch`) or a recipe (`mutate`), follows the same
//! path: compute the new value, replace the snapshot, notify local
//! subscribers, then hand `(key, state)` to the [`StateSink`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde_json::{Map, Value};
use statebridge_core::{produce, StoreKey};
use tracing::{debug, trace, warn};

use crate::subscription::{ListenerSet, Subscription};
use crate::traits::{Listener, Reducer, StateSink, Store};

/// Result of a dispatch or mutate call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The snapshot changed and was broadcast.
    Applied,
    /// The new value equals the old one; nothing was notified.
    Unchanged,
    /// No store is registered under the key.
    UnknownKey,
    /// The key has no reducer bound.
    NoReducer,
}

struct HostEntry {
    state: Mutex<Value>,
    // Serializes transitions; `state` is only locked for reads and swaps.
    transitions: Mutex<()>,
    reducer: Option<Reducer>,
    listeners: ListenerSet,
}

impl HostEntry {
    fn new(state: Value, reducer: Option<Reducer>) -> Self {
        Self {
            state: Mutex::new(state),
            transitions: Mutex::new(()),
            reducer,
            listeners: ListenerSet::new(),
        }
    }

    fn snapshot(&self) -> Value {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// The authoritative per-key state registry.
///
/// Thread-safe via interior locks; the owning bridge decides who may
/// mutate. No lock is held while listeners or the sink run, so the sink
/// sees transitions of one key in order only when they are driven from a
/// single thread.
pub struct HostRegistry {
    entries: RwLock<HashMap<StoreKey, Arc<HostEntry>>>,
    sink: Option<Arc<dyn StateSink>>,
}

impl HostRegistry {
    /// Create a registry that broadcasts nowhere.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            sink: None,
        }
    }

    /// Create a registry that hands every transition to `sink`.
    pub fn with_sink(sink: Arc<dyn StateSink>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            sink: Some(sink),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a store.
    ///
    /// Idempotent per key: if `key` already exists (registered or
    /// materialized), nothing changes and `false` is returned. A fresh
    /// store starts from `initial` (an empty object if `None`) and its
    /// snapshot is published so attached endpoints get a baseline.
    pub fn register(&self, key: StoreKey, initial: Option<Value>, reducer: Option<Reducer>) -> bool {
        let state = initial.unwrap_or_else(empty_state);

        let entry = {
            let mut entries = self.write_entries();
            if entries.contains_key(&key) {
                debug!(key = %key, "store already registered, keeping first registration");
                return false;
            }
            let entry = Arc::new(HostEntry::new(state, reducer));
            entries.insert(key.clone(), Arc::clone(&entry));
            entry
        };

        debug!(key = %key, reducer = entry.reducer.is_some(), "registered store");
        self.publish(&key, &entry.snapshot());
        true
    }

    /// Whether `key` has a store.
    pub fn contains(&self, key: &StoreKey) -> bool {
        self.read_entries().contains_key(key)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Run the reducer bound to `key` on `event`.
    ///
    /// Unknown keys and keys without a reducer are logged and ignored.
    pub fn dispatch(&self, key: &StoreKey, event: &Value) -> DispatchOutcome {
        let Some(entry) = self.entry(key) else {
            warn!(key = %key, "dispatch to unknown store ignored");
            return DispatchOutcome::UnknownKey;
        };
        let Some(reducer) = entry.reducer.clone() else {
            warn!(key = %key, "dispatch to store without reducer ignored");
            return DispatchOutcome::NoReducer;
        };

        trace!(key = %key, %event, "dispatching event");
        self.transition(key, &entry, |state| reducer(state, event))
    }

    /// Apply `recipe` to a copy of the current state of `key`.
    ///
    /// An unknown key is materialized with an empty object first, so the
    /// broadcast path stays uniform. The recipe may read the registry, but
    /// must not start another transition of the same key.
    pub fn mutate<F>(&self, key: &StoreKey, recipe: F) -> DispatchOutcome
    where
        F: FnOnce(&mut Value),
    {
        let entry = self.entry_or_materialize(key);
        self.transition(key, &entry, |state| produce(state, recipe))
    }

    fn transition<F>(&self, key: &StoreKey, entry: &HostEntry, compute: F) -> DispatchOutcome
    where
        F: FnOnce(&Value) -> Value,
    {
        let next = {
            let _gate = entry.transitions.lock().unwrap_or_else(PoisonError::into_inner);
            let current = entry.snapshot();
            let next = compute(&current);
            if next == current {
                return DispatchOutcome::Unchanged;
            }
            *entry.state.lock().unwrap_or_else(PoisonError::into_inner) = next.clone();
            next
        };

        entry.listeners.notify(&next);
        self.publish(key, &next);
        DispatchOutcome::Applied
    }

    fn publish(&self, key: &StoreKey, state: &Value) {
        if let Some(sink) = &self.sink {
            sink.publish(key, state);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads and subscriptions
    // ─────────────────────────────────────────────────────────────────────────

    /// The current snapshot of `key`, if it exists.
    pub fn get_state(&self, key: &StoreKey) -> Option<Value> {
        self.entry(key).map(|entry| entry.snapshot())
    }

    /// Subscribe to `key`, materializing it if unknown.
    ///
    /// The listener runs once immediately with the current snapshot.
    pub fn subscribe(&self, key: &StoreKey, listener: Listener) -> Subscription {
        let entry = self.entry_or_materialize(key);
        let subscription = entry.listeners.add(Arc::clone(&listener));
        listener(&entry.snapshot());
        subscription
    }

    /// Number of listeners on `key`.
    pub fn listener_count(&self, key: &StoreKey) -> usize {
        self.entry(key).map(|entry| entry.listeners.len()).unwrap_or(0)
    }

    /// A [`Store`] handle onto `key`, materializing it if unknown.
    pub fn store(self: &Arc<Self>, key: StoreKey) -> HostStore {
        self.entry_or_materialize(&key);
        HostStore {
            key,
            registry: Arc::clone(self),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn entry(&self, key: &StoreKey) -> Option<Arc<HostEntry>> {
        self.read_entries().get(key).cloned()
    }

    fn entry_or_materialize(&self, key: &StoreKey) -> Arc<HostEntry> {
        if let Some(entry) = self.entry(key) {
            return entry;
        }

        let (entry, created) = {
            let mut entries = self.write_entries();
            match entries.get(key) {
                Some(entry) => (Arc::clone(entry), false),
                None => {
                    let entry = Arc::new(HostEntry::new(empty_state(), None));
                    entries.insert(key.clone(), Arc::clone(&entry));
                    (entry, true)
                }
            }
        };

        if created {
            warn!(key = %key, "materialized unregistered store with empty state");
            self.publish(key, &entry.snapshot());
        }
        entry
    }

    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<StoreKey, Arc<HostEntry>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<StoreKey, Arc<HostEntry>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HostRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_state() -> Value {
    Value::Object(Map::new())
}

/// A [`Store`] view of one key in a [`HostRegistry`].
#[derive(Clone)]
pub struct HostStore {
    key: StoreKey,
    registry: Arc<HostRegistry>,
}

impl HostStore {
    /// Apply a recipe to this store's state.
    pub fn mutate<F>(&self, recipe: F) -> DispatchOutcome
    where
        F: FnOnce(&mut Value),
    {
        self.registry.mutate(&self.key, recipe)
    }
}

impl Store for HostStore {
    fn key(&self) -> &StoreKey {
        &self.key
    }

    fn get_state(&self) -> Value {
        self.registry.get_state(&self.key).unwrap_or_else(empty_state)
    }

    fn dispatch(&self, event: Value) {
        self.registry.dispatch(&self.key, &event);
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.registry.subscribe(&self.key, listener)
    }
}
