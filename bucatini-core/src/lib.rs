//! Bucatini Core - Resumable MongoDB Oplog Tailer
//!
//! This crate continuously consumes the replication oplog, classifies each
//! logged operation against declared [`watch`] rules, and fans matched
//! events out to per-rule [`tracker`] handlers for inserts, updates, and
//! deletes. Delivery is resumable and at-least-once.
//!
//! # Key Components
//!
//! - **Tailer**: [`tailer`] owns the streaming cursor lifecycle — resume
//!   position, idle-timeout repolling, requerying, cancellation
//! - **Dispatcher**: [`dispatch`] matches events to watches and invokes
//!   handlers concurrently
//! - **Events**: [`event`] parses raw oplog entries into typed values
//! - **Trackers**: [`tracker`] is the capability set downstream consumers
//!   implement
//!
//! # Example
//!
//! ```rust
//! use bucatini_core::event::{OpKind, OplogEvent};
//! use bson::doc;
//!
//! let raw = doc! { "ns": "shop.orders", "op": "d", "o": { "_id": 5 } };
//! let event = OplogEvent::parse(&raw).unwrap();
//! assert_eq!(event.kind, OpKind::Delete);
//! ```

pub mod dispatch;
pub mod event;
pub mod fields;
pub mod metrics;
pub mod reference;
pub mod tailer;
pub mod timestamp;
pub mod tracker;
pub mod watch;
