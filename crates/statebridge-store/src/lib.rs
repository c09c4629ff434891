//! # Statebridge Store
//!
//! The store contract shared by every context, and the host-side registry
//! that owns authoritative state.
//!
//! ## Overview
//!
//! A store is one key's state plus its subscribers. The [`Store`] trait is
//! what UI bindings consume: `get_state`, `dispatch`, `subscribe`. On the
//! host, [`HostRegistry`] keeps exactly one authoritative snapshot per key,
//! applies reducers and recipes, notifies local subscribers and hands every
//! transition to a [`StateSink`] (the transport fan-out).
//!
//! ## Key Types
//!
//! - [`Store`] - The per-key contract implemented on both sides
//! - [`HostRegistry`] - Authoritative keyed registry
//! - [`HostStore`] - A [`Store`] handle onto one registry key
//! - [`ListenerSet`] / [`Subscription`] - Subscriber bookkeeping with
//!   idempotent unsubscribe
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use statebridge_core::StoreKey;
//! use statebridge_store::{reducer, HostRegistry};
//!
//! let registry = Arc::new(HostRegistry::new());
//! let key = StoreKey::new("counter").unwrap();
//!
//! registry.register(
//!     key.clone(),
//!     Some(json!({ "count": 0 })),
//!     Some(reducer(|state, event| match event["type"].as_str() {
//!         Some("INCREMENT") => json!({ "count": state["count"].as_i64().unwrap_or(0) + 1 }),
//!         _ => state.clone(),
//!     })),
//! );
//!
//! registry.dispatch(&key, &json!({ "type": "INCREMENT" }));
//! assert_eq!(registry.get_state(&key), Some(json!({ "count": 1 })));
//! ```
//!
//! ## Design Notes
//!
//! - **First registration wins**: registering a key twice leaves the first
//!   state and reducer in place.
//! - **Permissive mutate**: mutating or subscribing to an unknown key
//!   materializes it with an empty object.
//! - **No-op transitions**: a new value equal to the old one is neither
//!   notified nor broadcast.

pub mod registry;
pub mod subscription;
pub mod traits;

pub use registry::{DispatchOutcome, HostRegistry, HostStore};
pub use subscription::{ListenerSet, Subscription};
pub use traits::{listener, reducer, Listener, Reducer, StateSink, Store, StoreExt};
