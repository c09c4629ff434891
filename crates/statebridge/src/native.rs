//! The host-side bridge.
//!
//! `NativeBridge` owns the authoritative registry and the fan-out to every
//! attached mirror endpoint, and answers the envelopes mirrors send back.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use statebridge_core::{Envelope, StateDigest, StoreKey};
use statebridge_store::{DispatchOutcome, HostRegistry, HostStore, Listener, Reducer, Subscription};
use statebridge_sync::{Endpoint, EndpointId, FanOut};
use tracing::{debug, trace, warn};

use crate::bridge::{Bridge, BridgeConfig, MutableBridge};
use crate::error::Result;

/// The host bridge: authoritative state plus broadcast.
pub struct NativeBridge {
    registry: Arc<HostRegistry>,
    fanout: Arc<FanOut>,
    config: BridgeConfig,
}

impl NativeBridge {
    /// Create a host bridge with no stores and no endpoints.
    pub fn new(config: BridgeConfig) -> Self {
        let fanout = Arc::new(FanOut::new(config.patches_enabled));
        let registry = Arc::new(HostRegistry::with_sink(fanout.clone()));
        Self {
            registry,
            fanout,
            config,
        }
    }

    /// The bridge configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Arc<HostRegistry> {
        &self.registry
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Store Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a store. First registration wins; returns false if `key`
    /// already existed.
    pub fn register(&self, key: &str, initial: Option<Value>, reducer: Option<Reducer>) -> Result<bool> {
        Ok(self.registry.register(StoreKey::new(key)?, initial, reducer))
    }

    /// Run the reducer of `key` on `event`, as if a mirror had sent it.
    pub fn dispatch(&self, key: &str, event: &Value) -> Result<DispatchOutcome> {
        Ok(self.registry.dispatch(&StoreKey::new(key)?, event))
    }

    /// The current snapshot of `key`.
    pub fn get_state(&self, key: &str) -> Option<Value> {
        let key = StoreKey::new(key).ok()?;
        self.registry.get_state(&key)
    }

    /// Subscribe to `key`; the listener runs immediately with the current
    /// snapshot.
    pub fn subscribe(&self, key: &str, listener: Listener) -> Result<Subscription> {
        Ok(self.registry.subscribe(&StoreKey::new(key)?, listener))
    }

    /// Digest of the current snapshot of `key`.
    pub fn digest(&self, key: &str) -> Option<StateDigest> {
        self.get_state(key).map(|state| StateDigest::of(&state))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Endpoint Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Attach a mirror endpoint. It immediately receives the latest full
    /// snapshot of every store.
    pub fn attach(&self, endpoint: Arc<dyn Endpoint>) -> EndpointId {
        self.fanout.attach(endpoint)
    }

    /// Detach a mirror endpoint.
    pub fn detach(&self, id: EndpointId) -> bool {
        self.fanout.detach(id)
    }

    /// Number of attached endpoints.
    pub fn endpoint_count(&self) -> usize {
        self.fanout.endpoint_count()
    }

    /// Handle one serialized envelope received from endpoint `from`.
    ///
    /// Never fails: malformed or misdirected envelopes are logged and
    /// dropped.
    pub fn receive(&self, from: EndpointId, text: &str) {
        let envelope = match Envelope::decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(endpoint = %from, error = %e, "dropping malformed envelope");
                return;
            }
        };
        trace!(endpoint = %from, key = %envelope.key(), kind = %envelope.kind(), "received envelope");

        match envelope {
            Envelope::InitStore { key } | Envelope::RequestFullState { key } => {
                if !self.fanout.send_snapshot(from, &key) {
                    debug!(
                        endpoint = %from,
                        key = %key,
                        "no snapshot to send yet, mirror waits for registration"
                    );
                }
            }
            Envelope::Event { key, event } => {
                self.registry.dispatch(&key, &event);
            }
            other @ (Envelope::StateUpdate { .. } | Envelope::StatePatch { .. }) => {
                warn!(
                    endpoint = %from,
                    key = %other.key(),
                    kind = %other.kind(),
                    "mirror-bound envelope received by host"
                );
            }
        }
    }
}

impl Default for NativeBridge {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

#[async_trait]
impl Bridge for NativeBridge {
    type Store = HostStore;

    fn is_supported(&self) -> bool {
        true
    }

    /// Host stores are always initialized; an unknown key is materialized
    /// with an empty object.
    async fn get_store(&self, key: &str) -> Result<Arc<HostStore>> {
        Ok(Arc::new(self.registry.store(StoreKey::new(key)?)))
    }
}

impl MutableBridge for NativeBridge {
    fn mutate<F>(&self, key: &str, recipe: F) -> Result<DispatchOutcome>
    where
        F: FnOnce(&mut Value),
    {
        Ok(self.registry.mutate(&StoreKey::new(key)?, recipe))
    }
}
