//! Mirror stores: per-key replicas rebuilt from host envelopes.
//!
//! A mirror never originates state. Its snapshot is always a value the
//! host held at some instant: either a full `STATE_UPDATE` payload or the
//! result of applying a host patch onto such a value. A patch that does not
//! apply is dropped whole, no subscriber sees a partial result, and the
//! mirror asks for the full snapshot again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde_json::Value;
use statebridge_core::{apply_patch, Envelope, PatchError, PatchOp, StoreKey};
use statebridge_store::{Listener, ListenerSet, Store, Subscription};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::transport::MirrorTransport;

/// Result of handling one host envelope on a mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The snapshot changed and subscribers were notified.
    Applied,
    /// The received value equals the current snapshot.
    Unchanged,
    /// The patch did not match; a full snapshot was requested.
    Rejected(PatchError),
}

/// One key's replica in a mirror context.
pub struct MirrorStore {
    key: StoreKey,
    state: Mutex<Option<Value>>,
    listeners: ListenerSet,
    ready: watch::Sender<bool>,
    init_requested: AtomicBool,
    transport: Arc<dyn MirrorTransport>,
}

impl MirrorStore {
    /// Create an uninitialized mirror store.
    pub fn new(key: StoreKey, transport: Arc<dyn MirrorTransport>) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            key,
            state: Mutex::new(None),
            listeners: ListenerSet::new(),
            ready,
            init_requested: AtomicBool::new(false),
            transport,
        }
    }

    /// The last applied snapshot, or `None` before the first one arrived.
    pub fn try_state(&self) -> Option<Value> {
        self.lock_state().clone()
    }

    /// Whether at least one snapshot has been received.
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// A receiver that flips to `true` once the first snapshot lands.
    pub fn ready_signal(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    /// Send `INIT_STORE` unless the store is already initialized or the
    /// request already went out.
    pub fn request_init(&self) {
        if self.is_ready() || self.init_requested.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(key = %self.key, "requesting store initialization");
        self.send(&Envelope::InitStore {
            key: self.key.clone(),
        });
    }

    /// Forget an unanswered `INIT_STORE` so the next [`request_init`]
    /// sends it again. No effect once the store is ready.
    ///
    /// [`request_init`]: MirrorStore::request_init
    pub fn cancel_init_request(&self) {
        if !self.is_ready() {
            self.init_requested.store(false, Ordering::SeqCst);
        }
    }

    /// Replace the snapshot wholesale (`STATE_UPDATE`).
    pub fn apply_update(&self, payload: Value) -> ApplyOutcome {
        {
            let mut state = self.lock_state();
            if state.as_ref() == Some(&payload) {
                drop(state);
                self.mark_ready();
                return ApplyOutcome::Unchanged;
            }
            *state = Some(payload.clone());
        }

        trace!(key = %self.key, "applied full snapshot");
        self.mark_ready();
        self.listeners.notify(&payload);
        ApplyOutcome::Applied
    }

    /// Apply a host patch (`STATE_PATCH`) onto the current snapshot.
    ///
    /// On any mismatch, including a patch arriving before the first
    /// snapshot, the patch is discarded and `REQUEST_FULL_STATE` is sent.
    pub fn apply_patch(&self, patches: &[PatchOp]) -> ApplyOutcome {
        let next = {
            let mut state = self.lock_state();
            let result = match state.as_ref() {
                Some(current) => apply_patch(current, patches),
                None => Err(PatchError::PathNotFound(String::new())),
            };

            match result {
                Ok(next) if state.as_ref() == Some(&next) => return ApplyOutcome::Unchanged,
                Ok(next) => {
                    *state = Some(next.clone());
                    next
                }
                Err(e) => {
                    drop(state);
                    warn!(key = %self.key, error = %e, "patch does not apply, requesting full state");
                    self.send(&Envelope::RequestFullState {
                        key: self.key.clone(),
                    });
                    return ApplyOutcome::Rejected(e);
                }
            }
        };

        trace!(key = %self.key, ops = patches.len(), "applied patch");
        self.mark_ready();
        self.listeners.notify(&next);
        ApplyOutcome::Applied
    }

    fn mark_ready(&self) {
        self.ready.send_if_modified(|ready| !std::mem::replace(ready, true));
    }

    fn send(&self, envelope: &Envelope) {
        let result = envelope
            .encode()
            .map_err(crate::error::SyncError::from)
            .and_then(|text| self.transport.send(&text));
        if let Err(e) = result {
            warn!(key = %self.key, kind = %envelope.kind(), error = %e, "failed to send to host");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, Option<Value>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MirrorStore {
    fn key(&self) -> &StoreKey {
        &self.key
    }

    /// The last applied snapshot; `Value::Null` before initialization.
    /// Gate access on readiness (the bridge's `get_store` does).
    fn get_state(&self) -> Value {
        self.try_state().unwrap_or(Value::Null)
    }

    /// Forward the event to the host. Local state is left alone; it only
    /// changes when the host broadcasts the result.
    fn dispatch(&self, event: Value) {
        self.send(&Envelope::Event {
            key: self.key.clone(),
            event,
        });
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        let subscription = self.listeners.add(Arc::clone(&listener));
        if let Some(state) = self.try_state() {
            listener(&state);
        }
        subscription
    }
}

/// All mirror stores of one mirror context.
pub struct MirrorRegistry {
    stores: RwLock<HashMap<StoreKey, Arc<MirrorStore>>>,
    transport: Arc<dyn MirrorTransport>,
}

impl MirrorRegistry {
    /// Create an empty registry sending through `transport`.
    pub fn new(transport: Arc<dyn MirrorTransport>) -> Self {
        Self {
            stores: RwLock::new(HashMap::new()),
            transport,
        }
    }

    /// The mirror store for `key`, if one exists.
    pub fn get(&self, key: &StoreKey) -> Option<Arc<MirrorStore>> {
        self.stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// The mirror store for `key`, created on first use. Concurrent callers
    /// always get the same instance.
    pub fn get_or_create(&self, key: &StoreKey) -> Arc<MirrorStore> {
        if let Some(store) = self.get(key) {
            return store;
        }
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(stores.entry(key.clone()).or_insert_with(|| {
            debug!(key = %key, "created mirror store");
            Arc::new(MirrorStore::new(key.clone(), Arc::clone(&self.transport)))
        }))
    }

    /// Handle one serialized envelope from the host.
    ///
    /// Malformed text and host-bound envelope kinds are logged and dropped.
    /// Returns the outcome when a state envelope was processed.
    pub fn receive(&self, text: &str) -> Option<ApplyOutcome> {
        let envelope = match Envelope::decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "dropping malformed envelope");
                return None;
            }
        };

        match envelope {
            Envelope::StateUpdate { key, payload } => {
                Some(self.get_or_create(&key).apply_update(payload))
            }
            Envelope::StatePatch { key, patches } => {
                Some(self.get_or_create(&key).apply_patch(&patches))
            }
            other @ (Envelope::InitStore { .. }
            | Envelope::Event { .. }
            | Envelope::RequestFullState { .. }) => {
                warn!(key = %other.key(), kind = %other.kind(), "host-bound envelope received by mirror");
                None
            }
        }
    }
}
