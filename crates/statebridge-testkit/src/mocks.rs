//! Test doubles for code that consumes the store and bridge contracts.
//!
//! Neither double talks to a transport. They satisfy the same observable
//! contract as the real implementations, so UI-binding code can be tested
//! without wiring a host and a mirror together.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use statebridge::{Bridge, BridgeError, MutableBridge, Result};
use statebridge_core::StoreKey;
use statebridge_store::{
    DispatchOutcome, HostRegistry, HostStore, Listener, ListenerSet, Reducer, Store, Subscription,
};

/// A standalone in-memory store.
///
/// `dispatch` runs the reducer locally, when there is one, and notifies
/// subscribers if the state changed.
pub struct MockStore {
    key: StoreKey,
    state: Mutex<Value>,
    reducer: Option<Reducer>,
    listeners: ListenerSet,
}

impl MockStore {
    /// Create a store with an initial state and optional reducer.
    pub fn new(key: StoreKey, initial: Value, reducer: Option<Reducer>) -> Self {
        Self {
            key,
            state: Mutex::new(initial),
            reducer,
            listeners: ListenerSet::new(),
        }
    }

    /// Replace the state wholesale, notifying subscribers if it changed.
    pub fn set_state(&self, next: Value) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state == next {
                return;
            }
            *state = next.clone();
        }
        self.listeners.notify(&next);
    }

    /// Number of active subscribers.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Store for MockStore {
    fn key(&self) -> &StoreKey {
        &self.key
    }

    fn get_state(&self) -> Value {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn dispatch(&self, event: Value) {
        if let Some(reducer) = &self.reducer {
            let next = reducer(&self.get_state(), &event);
            self.set_state(next);
        }
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        let subscription = self.listeners.add(Arc::clone(&listener));
        listener(&self.get_state());
        subscription
    }
}

/// A bridge over a local registry, with no transport behind it.
pub struct MockBridge {
    registry: Arc<HostRegistry>,
    supported: bool,
}

impl MockBridge {
    /// A supported bridge with an empty registry.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(HostRegistry::new()),
            supported: true,
        }
    }

    /// A bridge that reports no host, as in a plain browser tab.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    /// Register a store on the underlying registry.
    pub fn with_store(self, key: &str, initial: Value, reducer: Option<Reducer>) -> Result<Self> {
        self.registry.register(StoreKey::new(key)?, Some(initial), reducer);
        Ok(self)
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Arc<HostRegistry> {
        &self.registry
    }
}

impl Default for MockBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bridge for MockBridge {
    type Store = HostStore;

    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn get_store(&self, key: &str) -> Result<Arc<HostStore>> {
        if !self.supported {
            return Err(BridgeError::Unsupported);
        }
        Ok(Arc::new(self.registry.store(StoreKey::new(key)?)))
    }
}

impl MutableBridge for MockBridge {
    fn mutate<F>(&self, key: &str, recipe: F) -> Result<DispatchOutcome>
    where
        F: FnOnce(&mut Value),
    {
        if !self.supported {
            return Err(BridgeError::Unsupported);
        }
        Ok(self.registry.mutate(&StoreKey::new(key)?, recipe))
    }
}
