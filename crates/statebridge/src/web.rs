//! The mirror-side bridge.
//!
//! A `WebBridge` lives inside an embedded web context. It holds one
//! [`MirrorStore`] per key, asks the host for the initial snapshot and
//! resolves `get_store` only once that snapshot has landed.

use std::sync::Arc;

use async_trait::async_trait;
use statebridge_core::{StateDigest, StoreKey};
use statebridge_sync::{ApplyOutcome, MirrorRegistry, MirrorStore, MirrorTransport};
use tokio::sync::watch;
use tracing::debug;

use crate::bridge::{Bridge, BridgeConfig};
use crate::error::{BridgeError, Result};

/// The mirror bridge.
pub struct WebBridge {
    mirrors: MirrorRegistry,
    supported: bool,
    config: BridgeConfig,
}

impl WebBridge {
    /// Create a mirror bridge. Transport availability is checked here, once.
    pub fn new(transport: Arc<dyn MirrorTransport>, config: BridgeConfig) -> Self {
        let supported = transport.is_available();
        if !supported {
            debug!("no host transport, web bridge disabled");
        }
        Self {
            mirrors: MirrorRegistry::new(transport),
            supported,
            config,
        }
    }

    /// The bridge configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Feed one serialized envelope received from the host.
    pub fn receive(&self, text: &str) -> Option<ApplyOutcome> {
        self.mirrors.receive(text)
    }

    /// The mirror store for `key` if it exists, ready or not.
    pub fn mirror(&self, key: &str) -> Option<Arc<MirrorStore>> {
        let key = StoreKey::new(key).ok()?;
        self.mirrors.get(&key)
    }

    /// Digest of the mirrored snapshot of `key`, once one has arrived.
    pub fn digest(&self, key: &str) -> Option<StateDigest> {
        self.mirror(key)?
            .try_state()
            .map(|state| StateDigest::of(&state))
    }
}

/// Wait until the store's readiness flag is set.
async fn wait_ready(ready: &mut watch::Receiver<bool>) -> Result<()> {
    loop {
        let is_ready = *ready.borrow_and_update();
        if is_ready {
            return Ok(());
        }
        ready.changed().await.map_err(|_| BridgeError::Closed)?;
    }
}

#[async_trait]
impl Bridge for WebBridge {
    type Store = MirrorStore;

    fn is_supported(&self) -> bool {
        self.supported
    }

    /// Resolve once the mirror store for `key` holds its first snapshot.
    ///
    /// The first caller for a key sends `INIT_STORE`; every later or
    /// concurrent caller waits on the same store. After a timeout the
    /// next caller sends the request again.
    async fn get_store(&self, key: &str) -> Result<Arc<MirrorStore>> {
        if !self.supported {
            return Err(BridgeError::Unsupported);
        }
        let key = StoreKey::new(key)?;
        let store = self.mirrors.get_or_create(&key);

        let mut ready = store.ready_signal();
        store.request_init();

        match self.config.ready_timeout {
            Some(limit) => match tokio::time::timeout(limit, wait_ready(&mut ready)).await {
                Ok(waited) => waited?,
                Err(_) => {
                    store.cancel_init_request();
                    return Err(BridgeError::Timeout(key));
                }
            },
            None => wait_ready(&mut ready).await?,
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use statebridge_core::Envelope;
    use statebridge_store::{listener, Store};
    use statebridge_sync::{MemoryLink, MemoryMirrorTransport};
    use std::sync::Mutex;
    use std::time::Duration;

    fn update(key: &str, payload: serde_json::Value) -> String {
        Envelope::StateUpdate {
            key: StoreKey::new(key).unwrap(),
            payload,
        }
        .encode()
        .unwrap()
    }

    #[tokio::test]
    async fn test_unsupported_context_rejects() {
        let bridge = WebBridge::new(
            Arc::new(MemoryMirrorTransport::detached()),
            BridgeConfig::default(),
        );
        assert!(!bridge.is_supported());
        assert!(matches!(
            bridge.get_store("counter").await,
            Err(BridgeError::Unsupported)
        ));
    }

    #[tokio::test]
    async fn test_invalid_key_rejected() {
        let link = MemoryLink::new();
        let bridge = WebBridge::new(Arc::new(link.mirror_transport.clone()), BridgeConfig::default());
        assert!(matches!(bridge.get_store("").await, Err(BridgeError::Core(_))));
    }

    #[tokio::test]
    async fn test_get_store_waits_for_snapshot() {
        let mut link = MemoryLink::new();
        let bridge = Arc::new(WebBridge::new(
            Arc::new(link.mirror_transport.clone()),
            BridgeConfig::default(),
        ));

        let pending = tokio::spawn({
            let bridge = Arc::clone(&bridge);
            async move { bridge.get_store("counter").await }
        });

        let init = link.to_host.recv().await.unwrap();
        assert_eq!(
            Envelope::decode(&init).unwrap(),
            Envelope::InitStore {
                key: StoreKey::new("counter").unwrap()
            }
        );

        bridge.receive(&update("counter", json!({ "count": 0 })));
        let store = pending.await.unwrap().unwrap();
        assert_eq!(store.get_state(), json!({ "count": 0 }));
    }

    #[tokio::test]
    async fn test_catch_up_resolves_without_init() {
        let mut link = MemoryLink::new();
        let bridge = WebBridge::new(Arc::new(link.mirror_transport.clone()), BridgeConfig::default());

        bridge.receive(&update("auth", json!({ "user": "ada" })));
        let store = bridge.get_store("auth").await.unwrap();

        assert_eq!(store.get_state(), json!({ "user": "ada" }));
        assert!(link.to_host.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_ready_timeout() {
        let link = MemoryLink::new();
        let config = BridgeConfig {
            ready_timeout: Some(Duration::from_millis(20)),
            ..BridgeConfig::default()
        };
        let bridge = WebBridge::new(Arc::new(link.mirror_transport.clone()), config);

        match bridge.get_store("never").await {
            Err(BridgeError::Timeout(key)) => assert_eq!(key.as_str(), "never"),
            other => panic!("expected timeout, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_init_resent_after_timeout() {
        let mut link = MemoryLink::new();
        let config = BridgeConfig {
            ready_timeout: Some(Duration::from_millis(20)),
            ..BridgeConfig::default()
        };
        let bridge = WebBridge::new(Arc::new(link.mirror_transport.clone()), config);

        assert!(matches!(bridge.get_store("late").await, Err(BridgeError::Timeout(_))));
        assert!(matches!(bridge.get_store("late").await, Err(BridgeError::Timeout(_))));

        let init = Envelope::InitStore {
            key: StoreKey::new("late").unwrap(),
        };
        for _ in 0..2 {
            let sent = link.to_host.try_recv().unwrap();
            assert_eq!(Envelope::decode(&sent).unwrap(), init);
        }
        assert!(link.to_host.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_mirror_subscriber_sees_updates() {
        let link = MemoryLink::new();
        let bridge = WebBridge::new(Arc::new(link.mirror_transport.clone()), BridgeConfig::default());
        bridge.receive(&update("counter", json!({ "count": 0 })));
        let store = bridge.get_store("counter").await.unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = store.subscribe(listener(move |state| sink.lock().unwrap().push(state.clone())));

        bridge.receive(&update("counter", json!({ "count": 5 })));
        sub.unsubscribe();
        bridge.receive(&update("counter", json!({ "count": 6 })));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![json!({ "count": 0 }), json!({ "count": 5 })]
        );
        assert_eq!(bridge.digest("counter"), Some(StateDigest::of(&json!({ "count": 6 }))));
    }
}
