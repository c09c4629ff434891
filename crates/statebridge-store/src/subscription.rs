//! Subscriber bookkeeping.
//!
//! A [`ListenerSet`] holds the callbacks of one store. Adding a listener
//! yields a [`Subscription`], the capability to remove it again.
//! `unsubscribe` is idempotent and stays safe after the owning store has
//! been dropped: the subscription only holds a weak reference.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;

use crate::traits::Listener;

#[derive(Default)]
struct ListenerSetInner {
    next_id: u64,
    listeners: BTreeMap<u64, Listener>,
}

/// The subscribers of one store.
#[derive(Clone, Default)]
pub struct ListenerSet {
    inner: Arc<Mutex<ListenerSetInner>>,
}

impl ListenerSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener, returning the capability to remove it.
    pub fn add(&self, listener: Listener) -> Subscription {
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.insert(id, listener);

        Subscription {
            id,
            set: Arc::downgrade(&self.inner),
        }
    }

    /// Invoke every listener with `state`.
    ///
    /// The set is snapshotted first, so listeners may subscribe or
    /// unsubscribe from inside the callback.
    pub fn notify(&self, state: &Value) {
        let listeners: Vec<Listener> = lock(&self.inner).listeners.values().cloned().collect();
        for listener in listeners {
            listener(state);
        }
    }

    /// Number of live listeners.
    pub fn len(&self) -> usize {
        lock(&self.inner).listeners.len()
    }

    /// Returns true if nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The capability to remove one listener.
#[derive(Clone)]
pub struct Subscription {
    id: u64,
    set: Weak<Mutex<ListenerSetInner>>,
}

impl Subscription {
    /// Remove the listener. Calling this again, or after the store is
    /// gone, does nothing.
    pub fn unsubscribe(&self) {
        if let Some(set) = self.set.upgrade() {
            lock(&set).listeners.remove(&self.id);
        }
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.set
            .upgrade()
            .map(|set| lock(&set).listeners.contains_key(&self.id))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

fn lock(inner: &Mutex<ListenerSetInner>) -> MutexGuard<'_, ListenerSetInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}
