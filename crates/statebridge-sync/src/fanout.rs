//! Transport fan-out: host-side broadcast to attached mirrors.
//!
//! The fan-out keeps, per key, the last snapshot it broadcast. That
//! snapshot is the baseline every patch is computed against, and the full
//! snapshot a newly attached endpoint is caught up with.
//!
//! Bookkeeping happens under one lock; sending does not. An endpoint may
//! therefore deliver synchronously into a mirror that answers the host
//! right away (an `EVENT`, a `REQUEST_FULL_STATE`), re-entering the
//! fan-out. Every baseline carries a generation: once a newer broadcast of
//! the same key has started, the older one stops sending, so no endpoint
//! receives a stale envelope after a newer one.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use statebridge_core::{plan_transfer, Envelope, EnvelopeKind, StoreKey, Transfer};
use statebridge_store::StateSink;
use tracing::{debug, trace, warn};

use crate::transport::{Endpoint, EndpointId};

/// Result of one broadcast.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// The envelope kind sent, or `None` if nothing needed sending.
    pub kind: Option<EnvelopeKind>,
    /// Endpoints that accepted the envelope.
    pub delivered: usize,
    /// Endpoints whose send failed.
    pub failed: usize,
    /// Endpoints skipped because a newer broadcast of the key superseded
    /// this one mid-delivery.
    pub superseded: usize,
}

struct Baseline {
    state: Value,
    generation: u64,
}

struct FanOutInner {
    next_id: u64,
    endpoints: BTreeMap<EndpointId, Arc<dyn Endpoint>>,
    baselines: HashMap<StoreKey, Baseline>,
}

/// Broadcasts authoritative transitions to every attached endpoint.
pub struct FanOut {
    inner: Mutex<FanOutInner>,
    patches_enabled: bool,
}

impl FanOut {
    /// Create a fan-out. With `patches_enabled == false` every transition
    /// is sent as a full snapshot.
    pub fn new(patches_enabled: bool) -> Self {
        Self {
            inner: Mutex::new(FanOutInner {
                next_id: 0,
                endpoints: BTreeMap::new(),
                baselines: HashMap::new(),
            }),
            patches_enabled,
        }
    }

    /// Attach an endpoint and catch it up with the latest full snapshot of
    /// every known key.
    ///
    /// The endpoint is registered before the catch-up is sent, so a
    /// broadcast issued meanwhile reaches it too.
    pub fn attach(&self, endpoint: Arc<dyn Endpoint>) -> EndpointId {
        let (id, keys) = {
            let mut inner = self.lock();
            let id = EndpointId(inner.next_id);
            inner.next_id += 1;
            inner.endpoints.insert(id, endpoint);
            (id, inner.baselines.keys().cloned().collect::<Vec<_>>())
        };
        debug!(endpoint = %id, keys = keys.len(), "attached endpoint");

        for key in &keys {
            self.send_snapshot(id, key);
        }
        id
    }

    /// Detach an endpoint. Returns false if it was not attached.
    pub fn detach(&self, id: EndpointId) -> bool {
        let removed = self.lock().endpoints.remove(&id).is_some();
        if removed {
            debug!(endpoint = %id, "detached endpoint");
        }
        removed
    }

    /// Number of attached endpoints.
    pub fn endpoint_count(&self) -> usize {
        self.lock().endpoints.len()
    }

    /// The last snapshot broadcast for `key`.
    pub fn baseline(&self, key: &StoreKey) -> Option<Value> {
        self.lock().baselines.get(key).map(|b| b.state.clone())
    }

    /// Send `state` for `key` to every endpoint, as a patch against the
    /// previous baseline when that is smaller, else as a full snapshot.
    pub fn broadcast(&self, key: &StoreKey, state: &Value) -> BroadcastReport {
        let (envelope, text, generation, endpoints) = {
            let mut inner = self.lock();
            let previous = inner.baselines.get(key).map(|b| &b.state);

            let transfer = if self.patches_enabled {
                plan_transfer(previous, state).unwrap_or_else(|e| {
                    warn!(key = %key, error = %e, "patch planning failed, sending full snapshot");
                    Transfer::Full(state.clone())
                })
            } else if previous == Some(state) {
                Transfer::Unchanged
            } else {
                Transfer::Full(state.clone())
            };

            let envelope = match transfer {
                Transfer::Unchanged => return BroadcastReport::default(),
                Transfer::Full(payload) => Envelope::StateUpdate {
                    key: key.clone(),
                    payload,
                },
                Transfer::Patch(patches) => Envelope::StatePatch {
                    key: key.clone(),
                    patches,
                },
            };

            let generation = inner.baselines.get(key).map_or(0, |b| b.generation + 1);
            inner.baselines.insert(
                key.clone(),
                Baseline {
                    state: state.clone(),
                    generation,
                },
            );

            let text = match envelope.encode() {
                Ok(text) => text,
                Err(e) => {
                    warn!(key = %key, error = %e, "failed to encode envelope");
                    return BroadcastReport::default();
                }
            };

            let endpoints: Vec<_> = inner
                .endpoints
                .iter()
                .map(|(id, endpoint)| (*id, Arc::clone(endpoint)))
                .collect();
            (envelope, text, generation, endpoints)
        };

        let mut report = BroadcastReport {
            kind: Some(envelope.kind()),
            ..Default::default()
        };
        for (id, endpoint) in &endpoints {
            if !self.is_current(key, generation) {
                report.superseded += 1;
                continue;
            }
            match endpoint.send(&text) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(endpoint = %id, key = %key, error = %e, "endpoint send failed");
                }
            }
        }

        if report.superseded > 0 {
            debug!(key = %key, skipped = report.superseded, "broadcast superseded mid-delivery");
        }
        trace!(
            key = %key,
            kind = %envelope.kind(),
            bytes = text.len(),
            delivered = report.delivered,
            "broadcast state"
        );
        report
    }

    /// Send the current baseline of `key` to one endpoint as a full
    /// snapshot. Returns false if the endpoint or the key is unknown.
    pub fn send_snapshot(&self, id: EndpointId, key: &StoreKey) -> bool {
        let (endpoint, state) = {
            let inner = self.lock();
            match (inner.endpoints.get(&id), inner.baselines.get(key)) {
                (Some(endpoint), Some(baseline)) => (Arc::clone(endpoint), baseline.state.clone()),
                _ => return false,
            }
        };
        send_full(id, endpoint.as_ref(), key, state)
    }

    fn is_current(&self, key: &StoreKey, generation: u64) -> bool {
        self.lock()
            .baselines
            .get(key)
            .is_some_and(|b| b.generation == generation)
    }

    fn lock(&self) -> MutexGuard<'_, FanOutInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateSink for FanOut {
    fn publish(&self, key: &StoreKey, state: &Value) {
        self.broadcast(key, state);
    }
}

fn send_full(id: EndpointId, endpoint: &dyn Endpoint, key: &StoreKey, payload: Value) -> bool {
    let envelope = Envelope::StateUpdate {
        key: key.clone(),
        payload,
    };
    let result = envelope
        .encode()
        .map_err(crate::error::SyncError::from)
        .and_then(|text| endpoint.send(&text));

    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(endpoint = %id, key = %key, error = %e, "failed to send snapshot");
            false
        }
    }
}
