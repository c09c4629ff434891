//! # Statebridge Testkit
//!
//! Testing utilities for statebridge.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Generators**: Proptest strategies for JSON store states
//! - **Fixtures**: A host bridge with mirrors connected over in-memory
//!   links, and listeners that record what they see
//! - **Mocks**: `MockStore` and `MockBridge` doubles with no transport
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use statebridge_core::{apply_patch, diff};
//! use statebridge_testkit::generators::json_state;
//!
//! proptest! {
//!     #[test]
//!     fn patch_round_trip(a in json_state(), b in json_state()) {
//!         prop_assert_eq!(apply_patch(&a, &diff(&a, &b)).unwrap(), b);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use serde_json::json;
//! use statebridge::Bridge;
//! use statebridge_testkit::TestFixture;
//!
//! async fn example() {
//!     let fixture = TestFixture::new();
//!     fixture.host.register("counter", Some(json!({ "count": 0 })), None).unwrap();
//!
//!     let mirror = fixture.connect();
//!     let store = mirror.bridge.get_store("counter").await.unwrap();
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use fixtures::{init_tracing, recorder, MirrorHandle, StateStream, TestFixture, WAIT_LIMIT};
pub use generators::{json_state, json_value, state_history, store_key, todo_state};
pub use mocks::{MockBridge, MockStore};
