//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a host bridge with mirrors
//! wired to it over in-memory links, plus helpers for awaiting state.

use std::sync::{Arc, Once};
use std::time::Duration;

use serde_json::Value;
use statebridge::{BridgeConfig, EndpointId, NativeBridge, WebBridge};
use statebridge_store::{listener, Listener};
use statebridge_sync::MemoryLink;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// How long helpers wait before giving up.
pub const WAIT_LIMIT: Duration = Duration::from_secs(2);

static TRACING: Once = Once::new();

/// Install a test-friendly tracing subscriber once per process.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .try_init();
    });
}

/// A host bridge that mirrors can be connected to.
///
/// Must be used from within a tokio runtime: every connected mirror gets
/// two pump tasks forwarding envelopes in each direction.
pub struct TestFixture {
    pub host: Arc<NativeBridge>,
    config: BridgeConfig,
}

/// One mirror connected to a [`TestFixture`].
pub struct MirrorHandle {
    pub bridge: Arc<WebBridge>,
    pub id: EndpointId,
    pumps: [JoinHandle<()>; 2],
}

impl MirrorHandle {
    /// Stop forwarding envelopes in both directions.
    pub fn stop(&self) {
        for pump in &self.pumps {
            pump.abort();
        }
    }
}

impl Drop for MirrorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl TestFixture {
    /// Create a fixture with the default configuration.
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    /// Create a fixture whose host and mirrors share `config`.
    pub fn with_config(config: BridgeConfig) -> Self {
        init_tracing();
        Self {
            host: Arc::new(NativeBridge::new(config.clone())),
            config,
        }
    }

    /// Attach a new mirror to the host and start pumping envelopes.
    pub fn connect(&self) -> MirrorHandle {
        let MemoryLink {
            endpoint,
            mirror_transport,
            mut to_mirror,
            mut to_host,
        } = MemoryLink::new();

        let id = self.host.attach(Arc::new(endpoint));
        let bridge = Arc::new(WebBridge::new(Arc::new(mirror_transport), self.config.clone()));

        let downstream = tokio::spawn({
            let bridge = Arc::clone(&bridge);
            async move {
                while let Some(text) = to_mirror.recv().await {
                    bridge.receive(&text);
                }
            }
        });
        let upstream = tokio::spawn({
            let host = Arc::clone(&self.host);
            async move {
                while let Some(text) = to_host.recv().await {
                    host.receive(id, &text);
                }
            }
        });

        MirrorHandle {
            bridge,
            id,
            pumps: [downstream, upstream],
        }
    }

    /// Detach a mirror from the host and stop its pumps.
    pub fn disconnect(&self, mirror: &MirrorHandle) {
        self.host.detach(mirror.id);
        mirror.stop();
    }

    /// Wait until `mirror` holds the same snapshot of `key` as the host.
    pub async fn converged(&self, mirror: &MirrorHandle, key: &str) -> bool {
        let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
        loop {
            let host = self.host.digest(key);
            if host.is_some() && host == mirror.bridge.digest(key) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// States observed by a listener, in delivery order.
pub struct StateStream {
    rx: mpsc::UnboundedReceiver<Value>,
}

impl StateStream {
    /// The next observed state, or `None` after [`WAIT_LIMIT`].
    pub async fn next(&mut self) -> Option<Value> {
        tokio::time::timeout(WAIT_LIMIT, self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Skip observed states until one satisfies `predicate`.
    pub async fn wait_for<F>(&mut self, predicate: F) -> Option<Value>
    where
        F: Fn(&Value) -> bool,
    {
        while let Some(state) = self.next().await {
            if predicate(&state) {
                return Some(state);
            }
        }
        None
    }

    /// Everything observed so far, without waiting.
    pub fn drain(&mut self) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(state) = self.rx.try_recv() {
            out.push(state);
        }
        out
    }
}

/// A listener that records every state it is called with.
pub fn recorder() -> (Listener, StateStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    let listener = listener(move |state: &Value| {
        let _ = tx.send(state.clone());
    });
    (listener, StateStream { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use statebridge::Bridge;

    #[tokio::test]
    async fn test_connected_mirror_catches_up() {
        let fixture = TestFixture::new();
        fixture
            .host
            .register("counter", Some(json!({ "count": 0 })), None)
            .unwrap();

        let mirror = fixture.connect();
        assert!(fixture.converged(&mirror, "counter").await);
        assert!(mirror.bridge.get_store("counter").await.is_ok());
    }

    #[tokio::test]
    async fn test_recorder_stream() {
        let (listener, mut stream) = recorder();
        listener(&json!(1));
        listener(&json!(2));

        assert_eq!(stream.wait_for(|v| v == &json!(2)).await, Some(json!(2)));
        assert!(stream.drain().is_empty());
    }
}
