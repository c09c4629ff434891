//! Host and mirror wired back to back with synchronous delivery: every send
//! runs the receiving side before it returns, so replies re-enter the
//! sender while it is still broadcasting.

use std::sync::mpsc;
use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};
use statebridge::sync::{Result as SyncResult, SyncError};
use statebridge::{
    listener, reducer, BridgeConfig, Endpoint, EndpointId, Envelope, MirrorTransport,
    MutableBridge, NativeBridge, Store, StoreKey, WebBridge,
};
use statebridge_testkit::{init_tracing, todo_state};

const HANG_LIMIT: Duration = Duration::from_secs(5);

/// Host side: hands each message straight to the mirror.
#[derive(Default)]
struct LoopbackEndpoint {
    mirror: OnceLock<Weak<WebBridge>>,
}

impl Endpoint for LoopbackEndpoint {
    fn send(&self, message: &str) -> SyncResult<()> {
        let mirror = self.mirror.get().and_then(Weak::upgrade).ok_or(SyncError::Closed)?;
        mirror.receive(message);
        Ok(())
    }
}

/// Mirror side: hands each message straight to the host.
struct LoopbackTransport {
    host: Weak<NativeBridge>,
    id: OnceLock<EndpointId>,
}

impl MirrorTransport for LoopbackTransport {
    fn send(&self, message: &str) -> SyncResult<()> {
        let host = self.host.upgrade().ok_or(SyncError::Closed)?;
        let id = self.id.get().ok_or(SyncError::Closed)?;
        host.receive(*id, message);
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn connect(host: &Arc<NativeBridge>) -> Arc<WebBridge> {
    let transport = Arc::new(LoopbackTransport {
        host: Arc::downgrade(host),
        id: OnceLock::new(),
    });
    let mirror = Arc::new(WebBridge::new(transport.clone(), BridgeConfig::default()));

    let endpoint = Arc::new(LoopbackEndpoint::default());
    let _ = endpoint.mirror.set(Arc::downgrade(&mirror));
    let _ = transport.id.set(host.attach(endpoint));
    mirror
}

/// Run `body` on its own thread and fail if it does not finish in time.
fn within_limit<T: Send + 'static>(body: impl FnOnce() -> T + Send + 'static) -> T {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(body());
    });
    rx.recv_timeout(HANG_LIMIT)
        .expect("loopback exchange did not finish, host and mirror deadlocked")
}

#[test]
fn test_rejected_patch_recovers_during_broadcast() {
    init_tracing();
    let (host_digest, mirror_digest) = within_limit(|| {
        let host = Arc::new(NativeBridge::new(BridgeConfig::default()));
        host.register("todos", Some(todo_state(20)), None).unwrap();
        let mirror = connect(&host);

        // Knock the mirror off the host's baseline so the next patch fails.
        let diverged = Envelope::StateUpdate {
            key: StoreKey::new("todos").unwrap(),
            payload: json!({ "filter": "all", "todos": [] }),
        };
        mirror.receive(&diverged.encode().unwrap());

        // The patch is rejected mid-broadcast and the full-state request
        // comes straight back into the host.
        host.mutate("todos", |draft| draft["todos"][3]["done"] = json!(true))
            .unwrap();

        (host.digest("todos"), mirror.digest("todos"))
    });

    assert!(host_digest.is_some());
    assert_eq!(host_digest, mirror_digest);
}

#[test]
fn test_mirror_subscriber_dispatches_during_notify() {
    init_tracing();
    let (host_state, mirror_state) = within_limit(|| {
        let host = Arc::new(NativeBridge::new(BridgeConfig::default()));
        let counter = reducer(|state, event| match event["type"].as_str() {
            Some("INCREMENT") => json!({ "count": state["count"].as_i64().unwrap_or(0) + 1 }),
            _ => state.clone(),
        });
        host.register("counter", Some(json!({ "count": 0 })), Some(counter))
            .unwrap();
        let mirror = connect(&host);

        let store = mirror.mirror("counter").unwrap();
        let weak = Arc::downgrade(&store);
        let _sub = store.subscribe(listener(move |state: &Value| {
            if state["count"].as_i64().unwrap_or(0) < 3 {
                if let Some(store) = weak.upgrade() {
                    store.dispatch(json!({ "type": "INCREMENT" }));
                }
            }
        }));

        (host.get_state("counter"), store.try_state())
    });

    assert_eq!(host_state, Some(json!({ "count": 3 })));
    assert_eq!(mirror_state, Some(json!({ "count": 3 })));
}
