// Copyright 2025 Bucatini Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

//! Tracker trait: the downstream consumer of classified change events.
//!
//! The dispatcher translates each matched oplog entry into exactly one of the
//! three handler calls below. Implementations perform the actual persistence
//! work (mirroring documents, propagating updates, invalidating copies) and
//! may do further I/O against the store.
//!
//! # Delivery semantics
//!
//! Delivery is at-least-once: under requery or a full rescan the tailer can
//! redeliver entries already seen, so handlers should be idempotent. Handler
//! errors are per-event — the dispatcher logs them and moves on; they never
//! abort the tail loop.
//!
//! # Implementing a tracker
//!
//! ```rust
//! use bucatini_core::reference::DocumentReference;
//! use bucatini_core::tracker::{Tracker, TrackerError};
//! use bucatini_core::watch::Watch;
//! use async_trait::async_trait;
//! use bson::Document;
//!
//! struct PrintTracker;
//!
//! #[async_trait]
//! impl Tracker for PrintTracker {
//!     async fn handle_insert(
//!         &self,
//!         watch: &Watch,
//!         document: &Document,
//!         reference: &DocumentReference,
//!     ) -> Result<(), TrackerError> {
//!         println!("insert into {}: {:?}", watch.target_collection, reference.id);
//!         Ok(())
//!     }
//!
//!     async fn handle_update(
//!         &self,
//!         watch: &Watch,
//!         document: &Document,
//!         selector: &Document,
//!     ) -> Result<(), TrackerError> {
//!         println!("update in {}: {:?}", watch.track_collection, selector);
//!         Ok(())
//!     }
//!
//!     async fn handle_remove(
//!         &self,
//!         watch: &Watch,
//!         document: &Document,
//!         selector: &Document,
//!     ) -> Result<(), TrackerError> {
//!         println!("remove from {}: {:?}", watch.track_collection, selector);
//!         Ok(())
//!     }
//! }
//! ```

use crate::reference::DocumentReference;
use crate::watch::Watch;
use async_trait::async_trait;
use bson::Document;
use thiserror::Error;

/// Errors a tracker handler may surface.
///
/// All variants are recovered locally by the dispatcher: logged, counted,
/// and dropped with the event.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A write against the store failed.
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    /// Event data could not be shaped into what the tracker persists.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Anything else.
    #[error("tracker error: {0}")]
    Other(String),
}

/// Capability set consumed by the dispatcher.
///
/// Implementations must be `Send + Sync`: handler invocations for different
/// entries run on independent concurrent tasks. Each implementation owns its
/// database connection handle, distinct from the one the tail loop reads
/// with, so long-running handler I/O cannot stall the read path.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// A document entered (or was refreshed in) a watch's target collection.
    ///
    /// `reference` identifies the inserted or updated document itself; for
    /// updates its id comes from the selector, not the modifier document.
    async fn handle_insert(
        &self,
        watch: &Watch,
        document: &Document,
        reference: &DocumentReference,
    ) -> Result<(), TrackerError>;

    /// A document in a watch's track collection was updated.
    ///
    /// `selector` identifies the updated document; `document` is the update's
    /// replacement or modifier specification.
    async fn handle_update(
        &self,
        watch: &Watch,
        document: &Document,
        selector: &Document,
    ) -> Result<(), TrackerError>;

    /// A document in a watch's track collection was deleted.
    async fn handle_remove(
        &self,
        watch: &Watch,
        document: &Document,
        selector: &Document,
    ) -> Result<(), TrackerError>;
}
