//! # Statebridge
//!
//! Keep named application stores consistent between a host context and
//! any number of embedded web contexts (mirrors).
//!
//! ## Overview
//!
//! The host owns the authoritative state of every store and runs all
//! reducers. Mirrors hold read replicas that follow the host through
//! full snapshots and JSON patches, and forward their events back to the
//! host instead of changing state locally.
//!
//! - [`NativeBridge`] - host side: registry, reducers, broadcast
//! - [`WebBridge`] - mirror side: replicas that resolve after the first
//!   snapshot
//! - [`Bridge`] - the contract both expose to UI bindings
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use statebridge::{BridgeConfig, NativeBridge, WebBridge};
//! use statebridge::sync::MemoryLink;
//!
//! let host = NativeBridge::new(BridgeConfig::default());
//! host.register("counter", Some(json!({ "count": 0 })), None).unwrap();
//!
//! let mut link = MemoryLink::new();
//! host.attach(Arc::new(link.endpoint.clone()));
//!
//! let mirror = WebBridge::new(Arc::new(link.mirror_transport.clone()), BridgeConfig::default());
//! while let Ok(text) = link.to_mirror.try_recv() {
//!     mirror.receive(&text);
//! }
//! assert_eq!(mirror.digest("counter"), host.digest("counter"));
//! ```
//!
//! ## Re-exports
//!
//! - `statebridge::core` - keys, envelopes, patches, digests
//! - `statebridge::store` - the store contract and host registry
//! - `statebridge::sync` - transports, fan-out and mirror stores

pub mod bridge;
pub mod error;
pub mod native;
pub mod web;

// Re-export component crates
pub use statebridge_core as core;
pub use statebridge_store as store;
pub use statebridge_sync as sync;

pub use bridge::{Bridge, BridgeConfig, MutableBridge};
pub use error::{BridgeError, Result};
pub use native::NativeBridge;
pub use web::WebBridge;

// Re-export commonly used types
pub use statebridge_core::{Envelope, PatchOp, StateDigest, StoreKey};
pub use statebridge_store::{
    listener, reducer, DispatchOutcome, Listener, Reducer, Store, StoreExt, Subscription,
};
pub use statebridge_sync::{Endpoint, EndpointId, MirrorTransport};
